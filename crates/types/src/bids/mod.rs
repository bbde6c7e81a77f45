//! Bid domain model
//!
//! Bids arrive already ranked by the auction server. Nothing in the core
//! re-sorts them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ads::AdSize;

pub mod request;
pub mod response;

pub use request::{BidRequest, BidRequestImpression};
pub use response::BidResponse;

/// Reward callback to notify the publisher's server when a rewarded ad completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardedCallback {
	pub url: String,
	#[serde(default = "default_callback_method")]
	pub method: String,
	pub body: Option<String>,
	#[serde(default)]
	pub max_retries: u32,
	#[serde(default)]
	pub retry_delay_secs: u64,
}

fn default_callback_method() -> String {
	"GET".to_string()
}

/// One ranked offer from the auction response
#[derive(Debug, Clone, PartialEq)]
pub struct Bid {
	/// Unique bid identifier
	pub identifier: String,
	/// Partner network that placed the bid
	pub partner_id: String,
	/// Partner-specific placement string
	pub partner_placement: String,
	/// Ad markup for programmatic bids
	pub ad_markup: Option<String>,
	/// Partner-opaque details forwarded to the adapter
	pub partner_details: Option<HashMap<String, serde_json::Value>>,
	pub line_item_id: Option<String>,
	/// Impression-level revenue disclosure payload
	pub ilrd: Option<serde_json::Value>,
	pub cpm_price: Option<f64>,
	pub ad_revenue: Option<f64>,
	pub clearing_price: Option<f64>,
	/// Shared by every bid of one auction response
	pub auction_id: String,
	pub is_programmatic: bool,
	pub rewarded_callback: Option<RewardedCallback>,
	pub win_url: Option<String>,
	pub loss_url: Option<String>,
	pub size: Option<AdSize>,
}

impl Bid {
	/// Minimal bid for a partner, mostly useful for tests and demos
	pub fn new(
		identifier: impl Into<String>,
		partner_id: impl Into<String>,
		partner_placement: impl Into<String>,
		auction_id: impl Into<String>,
	) -> Self {
		Self {
			identifier: identifier.into(),
			partner_id: partner_id.into(),
			partner_placement: partner_placement.into(),
			ad_markup: None,
			partner_details: None,
			line_item_id: None,
			ilrd: None,
			cpm_price: None,
			ad_revenue: None,
			clearing_price: None,
			auction_id: auction_id.into(),
			is_programmatic: false,
			rewarded_callback: None,
			win_url: None,
			loss_url: None,
			size: None,
		}
	}

	pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
		self.ad_markup = Some(markup.into());
		self.is_programmatic = true;
		self
	}

	pub fn with_price(mut self, cpm_price: f64) -> Self {
		self.cpm_price = Some(cpm_price);
		self
	}

	pub fn with_size(mut self, size: AdSize) -> Self {
		self.size = Some(size);
		self
	}

	/// Best available price estimate: clearing price, then CPM, then revenue
	pub fn price(&self) -> Option<f64> {
		self.clearing_price.or(self.cpm_price).or(self.ad_revenue)
	}
}
