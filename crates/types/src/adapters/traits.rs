//! Core partner adapter traits
//!
//! Each partner network's SDK sits behind a [`PartnerAdapter`]. The core
//! only asks it for bidder tokens before an auction and for an ad once a
//! bid for that partner is being fulfilled.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use super::{AdapterResult, PartnerAdLoadRequest, PartnerIdentity, PreBidRequest};

/// A live ad produced by a partner SDK
pub trait PartnerAd: Send + Sync + Debug {
	/// Partner that produced the ad
	fn partner_id(&self) -> &str;

	/// Load attempt the ad belongs to
	fn load_id(&self) -> &str;

	/// Partner-specific details merged into the loaded ad's bid info
	fn details(&self) -> HashMap<String, serde_json::Value> {
		HashMap::new()
	}

	/// Release partner resources. Called when the ad is discarded unused.
	fn invalidate(&self) {}
}

/// Receives lifecycle callbacks from partner ads
pub trait PartnerAdDelegate: Send + Sync {
	/// The partner reports the ad can no longer be shown
	fn did_expire(&self, load_id: &str, partner_id: &str);

	fn did_track_impression(&self, _load_id: &str, _partner_id: &str) {}

	fn did_click(&self, _load_id: &str, _partner_id: &str) {}
}

/// Trait implemented by every partner network integration
#[async_trait]
pub trait PartnerAdapter: Send + Sync + Debug {
	/// Identity and version information of the integration
	fn partner_info(&self) -> &PartnerIdentity;

	/// Partner identifier used to route bids
	fn partner_id(&self) -> &str {
		&self.partner_info().partner_id
	}

	/// Bidder tokens to attach to the next bid request.
	///
	/// Default implementation returns no tokens.
	async fn fetch_bidder_information(
		&self,
		_request: &PreBidRequest,
	) -> AdapterResult<HashMap<String, String>> {
		Ok(HashMap::new())
	}

	/// Create an ad for a single bid. Resolves at most once per call.
	async fn load_ad(
		&self,
		request: &PartnerAdLoadRequest,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> AdapterResult<Arc<dyn PartnerAd>>;
}
