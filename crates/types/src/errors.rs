//! Error taxonomy surfaced by the mediation core

use std::time::Duration;

use thiserror::Error;

use crate::adapters::AdapterError;

/// One failed attempt of the fulfillment waterfall
#[derive(Debug, Clone, PartialEq)]
pub struct BidFailure {
	pub bid_identifier: String,
	pub partner_id: String,
	pub error: AdapterError,
}

/// Errors returned to callers of a load
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediationError {
	/// Caller must wait before loading this placement again
	#[error("Load rate limited for placement {placement}, retry in {retry_after:?}")]
	RateLimited {
		placement: String,
		retry_after: Duration,
	},

	/// The auction had no inventory
	#[error("Auction returned no bid")]
	AuctionNoBid,

	#[error("Invalid bid response: {reason}")]
	InvalidBidResponse { reason: String },

	#[error("Networking error: {reason}")]
	NetworkingError { reason: String },

	#[error("Mediation not initialized: {reason}")]
	NotInitialized { reason: String },

	/// Every bid of the waterfall failed
	#[error("All {} partner(s) failed to load", .failures.len())]
	PartnerErrors {
		auction_id: Option<String>,
		failures: Vec<BidFailure>,
	},

	#[error("Load timed out after {timeout_ms}ms")]
	LoadTimeout { timeout_ms: u64 },

	/// The load task ended without reporting, e.g. a partner adapter panicked
	#[error("Load {load_id} ended without a result")]
	LoadAborted { load_id: String },
}

impl MediationError {
	/// Whether the error indicates something went wrong, as opposed to an
	/// expected outcome such as rate limiting or an empty auction.
	pub fn is_fault(&self) -> bool {
		!matches!(
			self,
			MediationError::RateLimited { .. } | MediationError::AuctionNoBid
		)
	}

	pub fn invalid_bid_response(reason: impl Into<String>) -> Self {
		Self::InvalidBidResponse {
			reason: reason.into(),
		}
	}
}

pub type MediationResult<T> = Result<T, MediationError>;
