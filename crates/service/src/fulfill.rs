//! Bid fulfillment waterfall
//!
//! Walks a ranked bid list once, asking one partner at a time for an ad,
//! and stops at the first success. The list is never retried or reordered.

use std::sync::Arc;

use async_trait::async_trait;
use mediation_adapters::PartnerRegistry;
use mediation_types::{
	AdapterError, AdapterResult, Bid, BidFailure, LoadRequest, PartnerAd, PartnerAdDelegate,
	PartnerAdLoadRequest,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Creates a partner ad for a single bid
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PartnerAdLoader: Send + Sync {
	async fn load_partner_ad(
		&self,
		request: PartnerAdLoadRequest,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> AdapterResult<Arc<dyn PartnerAd>>;
}

#[async_trait]
impl PartnerAdLoader for PartnerRegistry {
	async fn load_partner_ad(
		&self,
		request: PartnerAdLoadRequest,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> AdapterResult<Arc<dyn PartnerAd>> {
		let adapter = self
			.get(&request.partner_id)
			.ok_or_else(|| AdapterError::PartnerNotFound {
				partner_id: request.partner_id.clone(),
			})?;
		adapter.load_ad(&request, delegate).await
	}
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FulfillError {
	#[error("No bids to fulfill")]
	NoBids,

	#[error("All {} bid(s) failed to load", .failures.len())]
	AllBidsFailed { failures: Vec<BidFailure> },

	#[error("Fulfillment cancelled")]
	Cancelled,
}

/// The winning bid and what it took to get there
#[derive(Debug)]
pub struct FulfilledBid {
	pub winning_bid: Bid,
	pub partner_ad: Arc<dyn PartnerAd>,
	/// Bids that failed before the winner, in attempt order
	pub runner_ups: Vec<BidFailure>,
	/// The full ranked list the waterfall walked
	pub bids: Vec<Bid>,
}

/// Position of a walk over a ranked bid list
#[derive(Debug, Clone)]
pub struct Waterfall {
	bids: Vec<Bid>,
	index: usize,
	failures: Vec<BidFailure>,
}

impl Waterfall {
	pub fn new(bids: Vec<Bid>) -> Self {
		Self {
			bids,
			index: 0,
			failures: Vec::new(),
		}
	}

	/// Bid to attempt next, if any remain
	pub fn next_bid(&self) -> Option<&Bid> {
		self.bids.get(self.index)
	}

	/// Record that the current bid failed and move past it
	pub fn record_failure(&mut self, error: AdapterError) {
		let Some(bid) = self.bids.get(self.index) else {
			return;
		};
		self.failures.push(BidFailure {
			bid_identifier: bid.identifier.clone(),
			partner_id: bid.partner_id.clone(),
			error,
		});
		self.index += 1;
	}

	pub fn is_exhausted(&self) -> bool {
		self.index >= self.bids.len()
	}

	/// Position of the current bid, 0-based
	pub fn position(&self) -> usize {
		self.index
	}

	pub fn len(&self) -> usize {
		self.bids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bids.is_empty()
	}

	pub fn failures(&self) -> &[BidFailure] {
		&self.failures
	}

	fn into_parts(self) -> (Vec<Bid>, Vec<BidFailure>) {
		(self.bids, self.failures)
	}
}

/// One pass over a bid list producing exactly one outcome.
///
/// `run` consumes the operation, so completion is delivered once. Cancel
/// through the token from [`BidFulfillOperation::cancellation_token`]: no
/// bid is attempted after cancellation, and an ad that arrives afterwards
/// is invalidated and dropped.
pub struct BidFulfillOperation {
	waterfall: Waterfall,
	request: LoadRequest,
	partners: Arc<dyn PartnerAdLoader>,
	delegate: Option<Arc<dyn PartnerAdDelegate>>,
	cancellation: CancellationToken,
}

impl BidFulfillOperation {
	pub fn new(
		bids: Vec<Bid>,
		request: LoadRequest,
		partners: Arc<dyn PartnerAdLoader>,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> Self {
		Self {
			waterfall: Waterfall::new(bids),
			request,
			partners,
			delegate,
			cancellation: CancellationToken::new(),
		}
	}

	pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
		self.cancellation = cancellation;
		self
	}

	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancellation.clone()
	}

	pub async fn run(mut self) -> Result<FulfilledBid, FulfillError> {
		if self.waterfall.is_empty() {
			return Err(FulfillError::NoBids);
		}

		while let Some(bid) = self.waterfall.next_bid().cloned() {
			if self.cancellation.is_cancelled() {
				info!(
					"Waterfall for load {} cancelled after {} attempt(s)",
					self.request.load_id(),
					self.waterfall.position()
				);
				return Err(FulfillError::Cancelled);
			}

			debug!(
				"Attempting bid {} ({}/{}) with partner {}",
				bid.identifier,
				self.waterfall.position() + 1,
				self.waterfall.len(),
				bid.partner_id
			);
			let partner_request = PartnerAdLoadRequest::new(&bid, &self.request);
			match self
				.partners
				.load_partner_ad(partner_request, self.delegate.clone())
				.await
			{
				Ok(partner_ad) => {
					if self.cancellation.is_cancelled() {
						debug!(
							"Discarding ad from {} that arrived after cancellation",
							bid.partner_id
						);
						partner_ad.invalidate();
						return Err(FulfillError::Cancelled);
					}

					info!(
						"Partner {} filled bid {} for placement {}",
						bid.partner_id,
						bid.identifier,
						self.request.placement()
					);
					let (bids, runner_ups) = self.waterfall.into_parts();
					return Ok(FulfilledBid {
						winning_bid: bid,
						partner_ad,
						runner_ups,
						bids,
					});
				},
				Err(e) => {
					warn!("Bid {} from {} failed: {}", bid.identifier, bid.partner_id, e);
					self.waterfall.record_failure(e);
				},
			}
		}

		let (_, failures) = self.waterfall.into_parts();
		Err(FulfillError::AllBidsFailed { failures })
	}
}
