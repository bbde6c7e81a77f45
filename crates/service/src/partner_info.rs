//! Bidder token collection ahead of an auction

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mediation_adapters::PartnerRegistry;
use mediation_types::{LoadRequest, PreBidRequest};
use tracing::{debug, warn};

use crate::dispatch::{DispatchQueue, GroupOutcome, TaskDispatcher, TaskDispatcherExt};
use crate::sync::lock;

/// Merged partner information attached to a bid request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartnerInfo {
	/// Bidder tokens keyed by partner identifier
	pub bidders: HashMap<String, HashMap<String, String>>,
	/// SDK/adapter version string keyed by partner identifier
	pub partner_versions: HashMap<String, String>,
}

/// Gathers partner bidder information for one load
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PartnerInfoCollector: Send + Sync {
	async fn collect(&self, request: &LoadRequest) -> PartnerInfo;
}

/// Asks every registered partner adapter for tokens concurrently.
///
/// Partners that fail or miss the deadline are left out of the bid request.
pub struct AdapterPartnerInfoCollector {
	registry: PartnerRegistry,
	dispatcher: Arc<dyn TaskDispatcher>,
	timeout: Duration,
}

impl AdapterPartnerInfoCollector {
	pub fn new(
		registry: PartnerRegistry,
		dispatcher: Arc<dyn TaskDispatcher>,
		timeout: Duration,
	) -> Self {
		Self {
			registry,
			dispatcher,
			timeout,
		}
	}
}

#[async_trait]
impl PartnerInfoCollector for AdapterPartnerInfoCollector {
	async fn collect(&self, request: &LoadRequest) -> PartnerInfo {
		let adapters = self.registry.all();
		let partner_versions = adapters
			.iter()
			.map(|adapter| {
				(
					adapter.partner_id().to_string(),
					adapter.partner_info().version_string(),
				)
			})
			.collect();

		let collected: Arc<Mutex<HashMap<String, HashMap<String, String>>>> = Arc::default();
		let pre_bid = PreBidRequest::from(request);
		let mut group = self.dispatcher.group(DispatchQueue::Background);

		for adapter in adapters {
			let collected = Arc::clone(&collected);
			let pre_bid = pre_bid.clone();
			group.add(async move {
				let partner_id = adapter.partner_id().to_string();
				match adapter.fetch_bidder_information(&pre_bid).await {
					Ok(tokens) => {
						debug!("Collected {} bidder token(s) from {}", tokens.len(), partner_id);
						lock(&collected).insert(partner_id, tokens);
					},
					Err(e) => {
						warn!("Skipping bidder information from {}: {}", partner_id, e);
					},
				}
			});
		}

		if group.join(self.timeout).await == GroupOutcome::TimedOut {
			warn!(
				"Partner token collection for {} timed out after {:?}",
				request.placement(),
				self.timeout
			);
		}

		let bidders = std::mem::take(&mut *lock(&collected));
		PartnerInfo {
			bidders,
			partner_versions,
		}
	}
}
