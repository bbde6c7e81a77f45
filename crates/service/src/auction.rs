//! Auction service
//!
//! One call to [`AuctionService::start_auction`] performs at most one bid
//! request and always resolves to exactly one [`AdAuctionResponse`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mediation_config::AuctionSettings;
use mediation_types::constants::headers;
use mediation_types::{
	AuctionHttpRequest, AuctionHttpResponse, AuctionTransport, Bid, BidRequest, BidResponse,
	LoadRequest, MediationError, MediationResult, TransportError,
};
use tracing::{debug, info, warn};

use crate::partner_info::{PartnerInfo, PartnerInfoCollector};
use crate::rate_limiter::RateLimiter;

/// App, device, user and regulatory context of a bid request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
	pub app: serde_json::Value,
	pub device: serde_json::Value,
	pub user: serde_json::Value,
	pub regs: serde_json::Value,
}

impl Default for RequestContext {
	fn default() -> Self {
		let empty = || serde_json::Value::Object(serde_json::Map::new());
		Self {
			app: empty(),
			device: empty(),
			user: empty(),
			regs: empty(),
		}
	}
}

/// Supplies the environment context for every bid request
#[cfg_attr(test, mockall::automock)]
pub trait RequestContextProvider: Send + Sync {
	fn context(&self) -> RequestContext;
}

/// Provider returning the same context for every request
#[derive(Debug, Clone, Default)]
pub struct StaticContextProvider {
	context: RequestContext,
}

impl StaticContextProvider {
	pub fn new(context: RequestContext) -> Self {
		Self { context }
	}
}

impl RequestContextProvider for StaticContextProvider {
	fn context(&self) -> RequestContext {
		self.context.clone()
	}
}

/// Terminal outcome of one auction
#[derive(Debug, Clone, PartialEq)]
pub struct AdAuctionResponse {
	/// Ranked bids, never empty on success
	pub result: MediationResult<Vec<Bid>>,
	/// Present whenever the server or a bid revealed it, even on failure
	pub auction_id: Option<String>,
}

impl AdAuctionResponse {
	fn failed(error: MediationError, auction_id: Option<String>) -> Self {
		Self {
			result: Err(error),
			auction_id,
		}
	}
}

/// Runs auctions against the mediation backend
pub struct AuctionService {
	transport: Arc<dyn AuctionTransport>,
	partner_info: Arc<dyn PartnerInfoCollector>,
	context: Arc<dyn RequestContextProvider>,
	rate_limiter: Arc<RateLimiter>,
	settings: AuctionSettings,
	sdk_version: String,
}

impl AuctionService {
	pub fn new(
		transport: Arc<dyn AuctionTransport>,
		partner_info: Arc<dyn PartnerInfoCollector>,
		context: Arc<dyn RequestContextProvider>,
		rate_limiter: Arc<RateLimiter>,
		settings: AuctionSettings,
		sdk_version: impl Into<String>,
	) -> Self {
		Self {
			transport,
			partner_info,
			context,
			rate_limiter,
			settings,
			sdk_version: sdk_version.into(),
		}
	}

	pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
		&self.rate_limiter
	}

	/// Run one auction for a load request
	pub async fn start_auction(&self, request: &LoadRequest) -> AdAuctionResponse {
		let placement = request.placement();

		if self.settings.rate_limiting_enabled {
			let retry_after = self.rate_limiter.time_until_next_load_is_allowed(placement);
			if !retry_after.is_zero() {
				info!(
					"Load for placement {} rate limited, retry in {:?}",
					placement, retry_after
				);
				return AdAuctionResponse::failed(
					MediationError::RateLimited {
						placement: placement.to_string(),
						retry_after,
					},
					None,
				);
			}
		}

		let partner_info = self.partner_info.collect(request).await;
		let http_request = self.build_request(request, partner_info);

		debug!(
			"Sending bid request for placement {} (load {})",
			placement,
			request.load_id()
		);
		let response = match self.transport.send(http_request).await {
			Ok(response) => response,
			Err(e) => {
				warn!("Bid request for placement {} failed: {}", placement, e);
				return AdAuctionResponse::failed(map_transport_error(e), None);
			},
		};

		self.handle_response(request, response)
	}

	fn build_request(&self, request: &LoadRequest, partner_info: PartnerInfo) -> AuctionHttpRequest {
		let context = self.context.context();
		let mut body = BidRequest::for_load(request);
		body.app = context.app;
		body.device = context.device;
		body.user = context.user;
		body.regs = context.regs;
		body.ext.bidders = partner_info.bidders;
		body.ext.partner_versions = partner_info.partner_versions;

		let rate_limit = self.rate_limiter.load_rate_limit(request.placement());
		let mut request_headers = HashMap::from([
			(headers::AD_TYPE.to_string(), request.format().as_str().to_string()),
			(headers::LOAD_ID.to_string(), request.load_id().to_string()),
			(headers::RATE_LIMIT_RESET.to_string(), rate_limit.as_secs().to_string()),
			(headers::SDK_VERSION.to_string(), self.sdk_version.clone()),
		]);
		if let Some(queue_id) = request.queue_id() {
			request_headers.insert(headers::QUEUE_ID.to_string(), queue_id.to_string());
		}

		AuctionHttpRequest {
			headers: request_headers,
			body,
		}
	}

	fn handle_response(&self, request: &LoadRequest, response: AuctionHttpResponse) -> AdAuctionResponse {
		let header_auction_id = response
			.header(headers::AUCTION_ID)
			.filter(|id| !id.is_empty())
			.map(str::to_string);

		let result = match response.status {
			200 => {
				self.record_rate_limit(request.placement(), &response);
				decode_bids(&response.body)
			},
			204 => {
				self.record_rate_limit(request.placement(), &response);
				Err(MediationError::AuctionNoBid)
			},
			status => Err(MediationError::invalid_bid_response(format!(
				"unexpected status {}",
				status
			))),
		};

		let auction_id = header_auction_id.or_else(|| {
			result
				.as_ref()
				.ok()
				.and_then(|bids| bids.first())
				.map(|bid| bid.auction_id.clone())
		});

		match &result {
			Ok(bids) => info!(
				"Auction {} for placement {} returned {} bid(s)",
				auction_id.as_deref().unwrap_or("-"),
				request.placement(),
				bids.len()
			),
			Err(MediationError::AuctionNoBid) => {
				info!("No bid for placement {}", request.placement())
			},
			Err(e) => warn!("Auction for placement {} failed: {}", request.placement(), e),
		}

		AdAuctionResponse { result, auction_id }
	}

	fn record_rate_limit(&self, placement: &str, response: &AuctionHttpResponse) {
		if !self.settings.rate_limiting_enabled {
			return;
		}
		let Some(value) = response.header(headers::RATE_LIMIT_RESET) else {
			return;
		};
		match value.trim().parse::<u64>() {
			Ok(seconds) => self
				.rate_limiter
				.set_load_rate_limit(Duration::from_secs(seconds), placement),
			Err(_) => warn!("Ignoring malformed rate limit header: {:?}", value),
		}
	}
}

fn decode_bids(body: &[u8]) -> MediationResult<Vec<Bid>> {
	let response: BidResponse = serde_json::from_slice(body).map_err(|e| {
		MediationError::invalid_bid_response(format!("failed to decode bid response: {}", e))
	})?;

	let bids = response.into_bids();
	if bids.is_empty() {
		return Err(MediationError::invalid_bid_response(
			"bid response contained no bids",
		));
	}
	Ok(bids)
}

fn map_transport_error(error: TransportError) -> MediationError {
	match error {
		TransportError::NotConfigured(reason) => MediationError::NotInitialized { reason },
		TransportError::Decode(reason) => MediationError::InvalidBidResponse { reason },
		other @ (TransportError::Timeout { .. }
		| TransportError::Connection(_)
		| TransportError::Network(_)) => MediationError::NetworkingError {
			reason: other.to_string(),
		},
	}
}
