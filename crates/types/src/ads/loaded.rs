//! Outcome of a successful load

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::adapters::PartnerAd;
use crate::ads::{AdSize, LoadRequest};
use crate::bids::Bid;

/// A loaded, renderable ad.
///
/// Deliberately not `Clone`: exactly one owner (the caller or a queue)
/// holds the partner ad at any time.
pub struct LoadedAd {
	/// Every bid of the auction, for analytics
	pub bids: Vec<Bid>,
	pub winning_bid: Bid,
	/// Winner's partner details merged with auction metadata
	pub bid_info: HashMap<String, serde_json::Value>,
	pub partner_ad: Arc<dyn PartnerAd>,
	/// Resolved size, banner formats only
	pub banner_size: Option<AdSize>,
	pub request: LoadRequest,
}

impl LoadedAd {
	pub fn auction_id(&self) -> &str {
		&self.winning_bid.auction_id
	}

	pub fn load_id(&self) -> &str {
		self.request.load_id()
	}

	pub fn partner_id(&self) -> &str {
		&self.winning_bid.partner_id
	}
}

impl fmt::Debug for LoadedAd {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoadedAd")
			.field("placement", &self.request.placement())
			.field("load_id", &self.request.load_id())
			.field("auction_id", &self.winning_bid.auction_id)
			.field("winning_partner", &self.winning_bid.partner_id)
			.field("bids", &self.bids.len())
			.field("banner_size", &self.banner_size)
			.finish()
	}
}
