//! Error types for partner adapter operations

use thiserror::Error;

/// Failure reported by a partner adapter while creating an ad.
///
/// These are opaque to the core. The waterfall records them per bid and
/// moves on to the next bid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
	#[error("No adapter registered for partner: {partner_id}")]
	PartnerNotFound { partner_id: String },

	#[error("Partner {partner_id} is not initialized")]
	NotInitialized { partner_id: String },

	#[error("Invalid configuration for partner {partner_id}: {reason}")]
	InvalidConfiguration { partner_id: String, reason: String },

	#[error("Partner {partner_id} does not support ad format {format}")]
	UnsupportedFormat { partner_id: String, format: String },

	#[error("Partner {partner_id} returned no fill")]
	NoFill { partner_id: String },

	#[error("Partner {partner_id} load timed out after {timeout_ms}ms")]
	Timeout { partner_id: String, timeout_ms: u64 },

	#[error("Partner {partner_id} load failed: {reason}")]
	LoadFailed { partner_id: String, reason: String },

	#[error("Bidder information unavailable from partner {partner_id}: {reason}")]
	BidderInfoUnavailable { partner_id: String, reason: String },
}

impl AdapterError {
	/// Create a generic load failure
	pub fn load_failed(partner_id: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::LoadFailed {
			partner_id: partner_id.into(),
			reason: reason.into(),
		}
	}

	/// Partner the error originated from
	pub fn partner_id(&self) -> &str {
		match self {
			AdapterError::PartnerNotFound { partner_id }
			| AdapterError::NotInitialized { partner_id }
			| AdapterError::InvalidConfiguration { partner_id, .. }
			| AdapterError::UnsupportedFormat { partner_id, .. }
			| AdapterError::NoFill { partner_id }
			| AdapterError::Timeout { partner_id, .. }
			| AdapterError::LoadFailed { partner_id, .. }
			| AdapterError::BidderInfoUnavailable { partner_id, .. } => partner_id,
		}
	}
}
