//! Mock partner adapters for demos and testing
//!
//! These adapters stand in for real partner SDKs. They fill or fail on
//! demand and record what the core asked of them.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use mediation_types::serde_json::{json, Value};
use mediation_types::{
	AdapterError, AdapterResult, PartnerAd, PartnerAdDelegate, PartnerAdLoadRequest,
	PartnerAdapter, PartnerIdentity, PreBidRequest,
};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ad produced by [`MockPartnerAdapter`]
#[derive(Debug)]
pub struct MockPartnerAd {
	partner_id: String,
	load_id: String,
	bid_identifier: String,
	invalidated: AtomicBool,
}

impl MockPartnerAd {
	pub fn new(request: &PartnerAdLoadRequest) -> Self {
		Self {
			partner_id: request.partner_id.clone(),
			load_id: request.load_id.clone(),
			bid_identifier: request.bid_identifier.clone(),
			invalidated: AtomicBool::new(false),
		}
	}

	pub fn bid_identifier(&self) -> &str {
		&self.bid_identifier
	}

	/// Whether the core discarded this ad
	pub fn is_invalidated(&self) -> bool {
		self.invalidated.load(Ordering::SeqCst)
	}
}

impl PartnerAd for MockPartnerAd {
	fn partner_id(&self) -> &str {
		&self.partner_id
	}

	fn load_id(&self) -> &str {
		&self.load_id
	}

	fn details(&self) -> HashMap<String, Value> {
		HashMap::from([("mock_bid".to_string(), json!(self.bid_identifier))])
	}

	fn invalidate(&self) {
		self.invalidated.store(true, Ordering::SeqCst);
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MockBehavior {
	Fill,
	NoFill,
}

/// Partner adapter with scripted behavior
pub struct MockPartnerAdapter {
	identity: PartnerIdentity,
	behavior: MockBehavior,
	tokens: HashMap<String, String>,
	load_delay: Option<Duration>,
	load_calls: AtomicUsize,
	requests: Mutex<Vec<PartnerAdLoadRequest>>,
	ads: Mutex<Vec<Arc<MockPartnerAd>>>,
	delegates: Mutex<HashMap<String, Arc<dyn PartnerAdDelegate>>>,
}

impl MockPartnerAdapter {
	fn with_behavior(partner_id: &str, behavior: MockBehavior) -> Self {
		Self {
			identity: PartnerIdentity::new(
				partner_id,
				format!("Mock {}", partner_id),
				"1.0.0",
				"1.0.0.0",
			),
			behavior,
			tokens: HashMap::from([("token".to_string(), format!("{}-token", partner_id))]),
			load_delay: None,
			load_calls: AtomicUsize::new(0),
			requests: Mutex::new(Vec::new()),
			ads: Mutex::new(Vec::new()),
			delegates: Mutex::new(HashMap::new()),
		}
	}

	/// Adapter that returns an ad for every bid
	pub fn filling(partner_id: &str) -> Self {
		Self::with_behavior(partner_id, MockBehavior::Fill)
	}

	/// Adapter that reports no fill for every bid
	pub fn failing(partner_id: &str) -> Self {
		Self::with_behavior(partner_id, MockBehavior::NoFill)
	}

	pub fn with_tokens(mut self, tokens: HashMap<String, String>) -> Self {
		self.tokens = tokens;
		self
	}

	/// Delay every ad load
	pub fn with_load_delay(mut self, delay: Duration) -> Self {
		self.load_delay = Some(delay);
		self
	}

	pub fn load_calls(&self) -> usize {
		self.load_calls.load(Ordering::SeqCst)
	}

	pub fn requests(&self) -> Vec<PartnerAdLoadRequest> {
		lock(&self.requests).clone()
	}

	/// Ads created so far, oldest first
	pub fn ads(&self) -> Vec<Arc<MockPartnerAd>> {
		lock(&self.ads).clone()
	}

	/// Report the ad of `load_id` as expired to the delegate it was loaded
	/// with. Returns false when no delegate is known for that load.
	pub fn expire(&self, load_id: &str) -> bool {
		let delegate = lock(&self.delegates).get(load_id).cloned();
		match delegate {
			Some(delegate) => {
				delegate.did_expire(load_id, &self.identity.partner_id);
				true
			},
			None => false,
		}
	}
}

impl fmt::Debug for MockPartnerAdapter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MockPartnerAdapter")
			.field("partner_id", &self.identity.partner_id)
			.field("behavior", &self.behavior)
			.field("load_calls", &self.load_calls())
			.finish()
	}
}

#[async_trait]
impl PartnerAdapter for MockPartnerAdapter {
	fn partner_info(&self) -> &PartnerIdentity {
		&self.identity
	}

	async fn fetch_bidder_information(
		&self,
		_request: &PreBidRequest,
	) -> AdapterResult<HashMap<String, String>> {
		Ok(self.tokens.clone())
	}

	async fn load_ad(
		&self,
		request: &PartnerAdLoadRequest,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> AdapterResult<Arc<dyn PartnerAd>> {
		self.load_calls.fetch_add(1, Ordering::SeqCst);
		lock(&self.requests).push(request.clone());
		debug!(
			"Mock partner {} loading bid {} for {}",
			self.identity.partner_id, request.bid_identifier, request.mediation_placement
		);

		if let Some(delay) = self.load_delay {
			tokio::time::sleep(delay).await;
		}

		match self.behavior {
			MockBehavior::Fill => {
				let ad = Arc::new(MockPartnerAd::new(request));
				lock(&self.ads).push(Arc::clone(&ad));
				if let Some(delegate) = delegate {
					lock(&self.delegates).insert(request.load_id.clone(), delegate);
				}
				Ok(ad)
			},
			MockBehavior::NoFill => Err(AdapterError::NoFill {
				partner_id: self.identity.partner_id.clone(),
			}),
		}
	}
}
