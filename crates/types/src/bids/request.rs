//! Bid request body sent to the auction endpoint
//!
//! Only the parts of the bidding protocol the core fills in itself are
//! modelled. App, device, user and regulatory context are opaque JSON
//! supplied by the embedding application.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ads::{AdFormat, AdSize, LoadRequest};

/// Impression being auctioned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRequestImpression {
	pub placement: String,
	pub format: AdFormat,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub size: Option<AdSize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keywords: Option<HashMap<String, String>>,
}

/// Per-request extension carrying partner bidder information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidRequestExt {
	/// Bidder tokens keyed by partner identifier
	pub bidders: HashMap<String, HashMap<String, String>>,
	/// Partner SDK and adapter versions keyed by partner identifier
	pub partner_versions: HashMap<String, String>,
	pub load_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub queue_id: Option<String>,
}

/// Body of a bid request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRequest {
	pub imp: Vec<BidRequestImpression>,
	pub app: serde_json::Value,
	pub device: serde_json::Value,
	pub user: serde_json::Value,
	pub regs: serde_json::Value,
	pub ext: BidRequestExt,
}

impl BidRequest {
	/// Build the impression part of a bid request from a load request.
	///
	/// Context objects default to empty JSON objects.
	pub fn for_load(request: &LoadRequest) -> Self {
		let empty = || serde_json::Value::Object(serde_json::Map::new());
		Self {
			imp: vec![BidRequestImpression {
				placement: request.placement().to_string(),
				format: request.format(),
				size: request.size(),
				keywords: request.keywords().cloned(),
			}],
			app: empty(),
			device: empty(),
			user: empty(),
			regs: empty(),
			ext: BidRequestExt {
				load_id: request.load_id().to_string(),
				queue_id: request.queue_id().map(str::to_string),
				..Default::default()
			},
		}
	}
}
