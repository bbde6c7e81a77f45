//! Partner adapter contract

use std::collections::HashMap;

pub mod errors;
pub mod traits;

pub use errors::AdapterError;
pub use traits::{PartnerAd, PartnerAdDelegate, PartnerAdapter};

use crate::ads::{AdFormat, AdSize, LoadRequest};
use crate::bids::Bid;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Identity of a partner integration
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerIdentity {
	pub partner_id: String,
	pub display_name: String,
	/// Version of the partner's SDK
	pub partner_sdk_version: String,
	/// Version of the adapter wrapping the SDK
	pub adapter_version: String,
}

impl PartnerIdentity {
	pub fn new(
		partner_id: impl Into<String>,
		display_name: impl Into<String>,
		partner_sdk_version: impl Into<String>,
		adapter_version: impl Into<String>,
	) -> Self {
		Self {
			partner_id: partner_id.into(),
			display_name: display_name.into(),
			partner_sdk_version: partner_sdk_version.into(),
			adapter_version: adapter_version.into(),
		}
	}

	/// Version string reported in bid requests
	pub fn version_string(&self) -> String {
		format!("{}/{}", self.partner_sdk_version, self.adapter_version)
	}
}

/// What a partner sees when asked for bidder tokens
#[derive(Debug, Clone, PartialEq)]
pub struct PreBidRequest {
	pub placement: String,
	pub format: AdFormat,
	pub load_id: String,
}

impl From<&LoadRequest> for PreBidRequest {
	fn from(request: &LoadRequest) -> Self {
		Self {
			placement: request.placement().to_string(),
			format: request.format(),
			load_id: request.load_id().to_string(),
		}
	}
}

/// What a partner sees when asked to create an ad for one bid
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerAdLoadRequest {
	pub partner_id: String,
	pub partner_placement: String,
	pub mediation_placement: String,
	pub format: AdFormat,
	pub size: Option<AdSize>,
	pub ad_markup: Option<String>,
	pub partner_details: HashMap<String, serde_json::Value>,
	pub partner_settings: HashMap<String, serde_json::Value>,
	pub bid_identifier: String,
	pub load_id: String,
}

impl PartnerAdLoadRequest {
	/// Build the partner request for a bid of a load.
	///
	/// Partner settings from the load request are filtered to the entry keyed
	/// by the bid's partner, when it is an object.
	pub fn new(bid: &Bid, request: &LoadRequest) -> Self {
		let partner_settings = request
			.partner_settings()
			.and_then(|settings| settings.get(&bid.partner_id))
			.and_then(|value| value.as_object())
			.map(|object| {
				object
					.iter()
					.map(|(key, value)| (key.clone(), value.clone()))
					.collect()
			})
			.unwrap_or_default();

		Self {
			partner_id: bid.partner_id.clone(),
			partner_placement: bid.partner_placement.clone(),
			mediation_placement: request.placement().to_string(),
			format: request.format(),
			size: bid.size.or(request.size()),
			ad_markup: bid.ad_markup.clone(),
			partner_details: bid.partner_details.clone().unwrap_or_default(),
			partner_settings,
			bid_identifier: bid.identifier.clone(),
			load_id: request.load_id().to_string(),
		}
	}
}
