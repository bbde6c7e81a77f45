//! Full ad load: auction followed by the fulfillment waterfall

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mediation_types::{LoadRequest, LoadedAd, MediationError, MediationResult, PartnerAdDelegate};
use serde_json::json;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auction::AuctionService;
use crate::dispatch::TaskDispatcher;
use crate::fulfill::{BidFulfillOperation, FulfillError, FulfilledBid, PartnerAdLoader};

/// Produces loaded ads for requests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdLoader: Send + Sync {
	async fn load(
		&self,
		request: LoadRequest,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> MediationResult<LoadedAd>;
}

/// Loader running an auction and a waterfall under one deadline.
///
/// The work runs on the dispatcher so an in-flight partner call can finish
/// after the deadline; its ad is then invalidated instead of delivered.
pub struct MediationAdLoader {
	auction: Arc<AuctionService>,
	partners: Arc<dyn PartnerAdLoader>,
	dispatcher: Arc<dyn TaskDispatcher>,
	load_timeout: Duration,
}

impl MediationAdLoader {
	pub fn new(
		auction: Arc<AuctionService>,
		partners: Arc<dyn PartnerAdLoader>,
		dispatcher: Arc<dyn TaskDispatcher>,
		load_timeout: Duration,
	) -> Self {
		Self {
			auction,
			partners,
			dispatcher,
			load_timeout,
		}
	}

	fn timeout_ms(&self) -> u64 {
		u64::try_from(self.load_timeout.as_millis()).unwrap_or(u64::MAX)
	}
}

#[async_trait]
impl AdLoader for MediationAdLoader {
	async fn load(
		&self,
		request: LoadRequest,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> MediationResult<LoadedAd> {
		let load_id = request.load_id().to_string();
		let cancellation = CancellationToken::new();
		let (sender, receiver) = oneshot::channel();

		let auction = Arc::clone(&self.auction);
		let partners = Arc::clone(&self.partners);
		let token = cancellation.clone();
		let timeout_ms = self.timeout_ms();
		self.dispatcher.spawn(Box::pin(async move {
			let outcome = run_load(&auction, partners, request, delegate, token, timeout_ms).await;
			if let Err(Ok(late)) = sender.send(outcome) {
				debug!("Discarding ad for load {} that finished after its deadline", late.load_id());
				late.partner_ad.invalidate();
			}
		}));

		match tokio::time::timeout(self.load_timeout, receiver).await {
			Ok(Ok(outcome)) => outcome,
			Ok(Err(_)) => {
				warn!("Load {} ended without a result", load_id);
				Err(MediationError::LoadAborted { load_id })
			},
			Err(_) => {
				cancellation.cancel();
				warn!("Load {} timed out after {}ms", load_id, timeout_ms);
				Err(MediationError::LoadTimeout { timeout_ms })
			},
		}
	}
}

async fn run_load(
	auction: &AuctionService,
	partners: Arc<dyn PartnerAdLoader>,
	request: LoadRequest,
	delegate: Option<Arc<dyn PartnerAdDelegate>>,
	cancellation: CancellationToken,
	timeout_ms: u64,
) -> MediationResult<LoadedAd> {
	let response = auction.start_auction(&request).await;
	let auction_id = response.auction_id;
	let bids = response.result?;

	let operation = BidFulfillOperation::new(bids, request.clone(), partners, delegate)
		.with_cancellation(cancellation);
	match operation.run().await {
		Ok(fulfilled) => Ok(loaded_ad(fulfilled, request)),
		Err(FulfillError::AllBidsFailed { failures }) => {
			Err(MediationError::PartnerErrors { auction_id, failures })
		},
		Err(FulfillError::NoBids) => Err(MediationError::invalid_bid_response(
			"auction returned no bids",
		)),
		Err(FulfillError::Cancelled) => Err(MediationError::LoadTimeout { timeout_ms }),
	}
}

fn loaded_ad(fulfilled: FulfilledBid, request: LoadRequest) -> LoadedAd {
	let FulfilledBid {
		winning_bid,
		partner_ad,
		bids,
		..
	} = fulfilled;

	let mut bid_info: HashMap<String, serde_json::Value> =
		winning_bid.partner_details.clone().unwrap_or_default();
	bid_info.extend(partner_ad.details());
	bid_info.insert("auction_id".to_string(), json!(winning_bid.auction_id));
	bid_info.insert("bid_id".to_string(), json!(winning_bid.identifier));
	bid_info.insert("partner_id".to_string(), json!(winning_bid.partner_id));
	if let Some(line_item_id) = &winning_bid.line_item_id {
		bid_info.insert("line_item_id".to_string(), json!(line_item_id));
	}
	if let Some(price) = winning_bid.price() {
		bid_info.insert("price".to_string(), json!(price));
	}

	let banner_size = if request.format().is_banner() {
		winning_bid.size.or(request.size())
	} else {
		None
	};

	LoadedAd {
		bids,
		winning_bid,
		bid_info,
		partner_ad,
		banner_size,
		request,
	}
}
