//! Bid response body returned by the auction endpoint

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Bid, RewardedCallback};
use crate::ads::AdSize;

/// Ranked auction response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidResponse {
	/// Auction identifier
	pub id: String,
	#[serde(default)]
	pub seatbid: Vec<SeatBid>,
}

/// Bids placed by one partner seat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatBid {
	pub seat: String,
	#[serde(default)]
	pub bid: Vec<WireBid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBid {
	pub id: String,
	#[serde(default)]
	pub price: Option<f64>,
	#[serde(default)]
	pub adm: Option<String>,
	#[serde(default)]
	pub nurl: Option<String>,
	#[serde(default)]
	pub lurl: Option<String>,
	#[serde(default)]
	pub w: Option<f64>,
	#[serde(default)]
	pub h: Option<f64>,
	pub ext: WireBidExt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBidExt {
	pub partner_placement: String,
	#[serde(default)]
	pub bidder: Option<HashMap<String, serde_json::Value>>,
	#[serde(default)]
	pub line_item_id: Option<String>,
	#[serde(default)]
	pub ilrd: Option<serde_json::Value>,
	#[serde(default)]
	pub ad_revenue: Option<f64>,
	#[serde(default)]
	pub clearing_price: Option<f64>,
	#[serde(default)]
	pub is_programmatic: Option<bool>,
	#[serde(default)]
	pub rewarded_callback: Option<RewardedCallback>,
}

impl BidResponse {
	/// Flatten seats into the server-ranked bid list.
	///
	/// Order is preserved: seats in response order, bids within a seat in
	/// response order.
	pub fn into_bids(self) -> Vec<Bid> {
		let auction_id = self.id;
		self.seatbid
			.into_iter()
			.flat_map(|seat| {
				let auction_id = auction_id.clone();
				let partner_id = seat.seat;
				seat.bid.into_iter().map(move |wire| {
					let size = match (wire.w, wire.h) {
						(Some(width), Some(height)) => Some(AdSize::new(width, height)),
						_ => None,
					};
					let is_programmatic = wire.ext.is_programmatic.unwrap_or(wire.adm.is_some());
					Bid {
						identifier: wire.id,
						partner_id: partner_id.clone(),
						partner_placement: wire.ext.partner_placement,
						ad_markup: wire.adm,
						partner_details: wire.ext.bidder,
						line_item_id: wire.ext.line_item_id,
						ilrd: wire.ext.ilrd,
						cpm_price: wire.price,
						ad_revenue: wire.ext.ad_revenue,
						clearing_price: wire.ext.clearing_price,
						auction_id: auction_id.clone(),
						is_programmatic,
						rewarded_callback: wire.ext.rewarded_callback,
						win_url: wire.nurl,
						loss_url: wire.lurl,
						size,
					}
				})
			})
			.collect()
	}
}
