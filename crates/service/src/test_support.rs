//! Fixtures shared by the service unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mediation_types::{
	AdapterError, AdapterResult, AuctionHttpRequest, AuctionHttpResponse, AuctionTransport, Bid,
	LoadRequest, LoadedAd, PartnerAd, PartnerAdDelegate, PartnerAdLoadRequest, PartnerAdapter,
	PartnerIdentity, PreBidRequest, TransportError,
};
use serde_json::json;

mockall::mock! {
	pub Transport {}

	#[async_trait]
	impl AuctionTransport for Transport {
		async fn send(
			&self,
			request: AuctionHttpRequest,
		) -> Result<AuctionHttpResponse, TransportError>;
	}
}

/// Bid identifiers in the order partners were asked to load them
pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
pub(crate) struct TestPartnerAd {
	partner_id: String,
	load_id: String,
	pub invalidated: AtomicBool,
}

impl TestPartnerAd {
	pub fn new(partner_id: &str, load_id: &str) -> Self {
		Self {
			partner_id: partner_id.to_string(),
			load_id: load_id.to_string(),
			invalidated: AtomicBool::new(false),
		}
	}
}

impl PartnerAd for TestPartnerAd {
	fn partner_id(&self) -> &str {
		&self.partner_id
	}

	fn load_id(&self) -> &str {
		&self.load_id
	}

	fn details(&self) -> HashMap<String, serde_json::Value> {
		HashMap::from([("creative".to_string(), json!("test"))])
	}

	fn invalidate(&self) {
		self.invalidated.store(true, Ordering::SeqCst);
	}
}

/// Partner adapter whose behavior is fixed at construction
#[derive(Debug)]
pub(crate) struct ScriptedAdapter {
	identity: PartnerIdentity,
	fills: bool,
	tokens: Option<HashMap<String, String>>,
	token_delay: Duration,
	calls: CallLog,
}

impl ScriptedAdapter {
	pub fn filling(partner_id: &str, calls: &CallLog) -> Self {
		Self::new(partner_id, true, calls)
	}

	pub fn failing(partner_id: &str, calls: &CallLog) -> Self {
		Self::new(partner_id, false, calls)
	}

	fn new(partner_id: &str, fills: bool, calls: &CallLog) -> Self {
		Self {
			identity: PartnerIdentity::new(partner_id, partner_id, "1.0.0", "1.0.0.0"),
			fills,
			tokens: Some(HashMap::from([("token".to_string(), format!("{partner_id}-token"))])),
			token_delay: Duration::ZERO,
			calls: Arc::clone(calls),
		}
	}

	pub fn without_tokens(mut self) -> Self {
		self.tokens = None;
		self
	}

	pub fn with_token_delay(mut self, delay: Duration) -> Self {
		self.token_delay = delay;
		self
	}
}

#[async_trait]
impl PartnerAdapter for ScriptedAdapter {
	fn partner_info(&self) -> &PartnerIdentity {
		&self.identity
	}

	async fn fetch_bidder_information(
		&self,
		_request: &PreBidRequest,
	) -> AdapterResult<HashMap<String, String>> {
		if !self.token_delay.is_zero() {
			tokio::time::sleep(self.token_delay).await;
		}
		self.tokens
			.clone()
			.ok_or_else(|| AdapterError::BidderInfoUnavailable {
				partner_id: self.identity.partner_id.clone(),
				reason: "not ready".to_string(),
			})
	}

	async fn load_ad(
		&self,
		request: &PartnerAdLoadRequest,
		_delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> AdapterResult<Arc<dyn PartnerAd>> {
		self.calls
			.lock()
			.unwrap()
			.push(request.bid_identifier.clone());
		if self.fills {
			Ok(Arc::new(TestPartnerAd::new(
				&request.partner_id,
				&request.load_id,
			)))
		} else {
			Err(AdapterError::NoFill {
				partner_id: request.partner_id.clone(),
			})
		}
	}
}

/// Ranked bids, one per partner, sharing one auction id
pub(crate) fn bids_for(partners: &[&str]) -> Vec<Bid> {
	partners
		.iter()
		.enumerate()
		.map(|(rank, partner)| {
			Bid::new(
				format!("bid-{rank}"),
				*partner,
				format!("{partner}-placement"),
				"auction-1",
			)
			.with_price(10.0 - rank as f64)
		})
		.collect()
}

/// Encoded bid response with one seat per partner, in rank order
pub(crate) fn bid_response_body(auction_id: &str, partners: &[&str]) -> Vec<u8> {
	let seats: Vec<serde_json::Value> = partners
		.iter()
		.enumerate()
		.map(|(rank, partner)| {
			json!({
				"seat": partner,
				"bid": [{
					"id": format!("bid-{rank}"),
					"price": 10.0 - rank as f64,
					"ext": {
						"partner_placement": format!("{partner}-placement"),
						"bidder": { "campaign": format!("{partner}-campaign") },
						"line_item_id": format!("li-{rank}")
					}
				}]
			})
		})
		.collect();
	serde_json::to_vec(&json!({ "id": auction_id, "seatbid": seats })).unwrap_or_default()
}

/// Loaded ad for a request, won by a single bid from `alpha`
pub(crate) fn loaded_ad_for(request: LoadRequest) -> LoadedAd {
	let bid = Bid::new("bid-0", "alpha", "alpha-placement", "auction-1");
	LoadedAd {
		bids: vec![bid.clone()],
		winning_bid: bid,
		bid_info: HashMap::new(),
		partner_ad: Arc::new(TestPartnerAd::new("alpha", request.load_id())),
		banner_size: None,
		request,
	}
}

/// Ad loader whose loads wait for explicitly released permits
pub(crate) struct GatedLoader {
	permits: tokio::sync::Semaphore,
	fail: AtomicBool,
	requests: Mutex<Vec<LoadRequest>>,
	delegates: Mutex<Vec<Arc<dyn PartnerAdDelegate>>>,
}

impl GatedLoader {
	pub fn new(permits: usize) -> Arc<Self> {
		Arc::new(Self {
			permits: tokio::sync::Semaphore::new(permits),
			fail: AtomicBool::new(false),
			requests: Mutex::new(Vec::new()),
			delegates: Mutex::new(Vec::new()),
		})
	}

	/// Loader that never blocks
	pub fn open() -> Arc<Self> {
		Self::new(tokio::sync::Semaphore::MAX_PERMITS)
	}

	pub fn release(&self, loads: usize) {
		self.permits.add_permits(loads);
	}

	pub fn fail_loads(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	pub fn calls(&self) -> usize {
		self.requests.lock().unwrap().len()
	}

	pub fn request(&self, index: usize) -> LoadRequest {
		self.requests.lock().unwrap()[index].clone()
	}

	pub fn delegate(&self, index: usize) -> Arc<dyn PartnerAdDelegate> {
		Arc::clone(&self.delegates.lock().unwrap()[index])
	}
}

#[async_trait]
impl crate::loader::AdLoader for GatedLoader {
	async fn load(
		&self,
		request: LoadRequest,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> mediation_types::MediationResult<LoadedAd> {
		self.requests.lock().unwrap().push(request.clone());
		if let Some(delegate) = delegate {
			self.delegates.lock().unwrap().push(delegate);
		}
		if let Ok(permit) = self.permits.acquire().await {
			permit.forget();
		}
		if self.fail.load(Ordering::SeqCst) {
			Err(mediation_types::MediationError::AuctionNoBid)
		} else {
			Ok(loaded_ad_for(request))
		}
	}
}

/// Queue event sink keeping every event it receives
#[derive(Default)]
pub(crate) struct RecordingSink {
	pub events: Mutex<Vec<(&'static str, mediation_types::QueueEvent)>>,
}

#[async_trait]
impl mediation_types::QueueEventSink for RecordingSink {
	async fn queue_started(&self, event: mediation_types::QueueEvent) {
		self.events.lock().unwrap().push(("started", event));
	}

	async fn queue_stopped(&self, event: mediation_types::QueueEvent) {
		self.events.lock().unwrap().push(("stopped", event));
	}
}

/// Let spawned tasks on a current-thread runtime run to quiescence
pub(crate) async fn settle() {
	for _ in 0..64 {
		tokio::task::yield_now().await;
	}
}
