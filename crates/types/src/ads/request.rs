//! Load request model

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ad formats supported by the mediation core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFormat {
	Interstitial,
	Rewarded,
	RewardedInterstitial,
	Banner,
	AdaptiveBanner,
}

impl AdFormat {
	/// Wire name of the format, used for the ad-type header and bid request
	pub fn as_str(&self) -> &'static str {
		match self {
			AdFormat::Interstitial => "interstitial",
			AdFormat::Rewarded => "rewarded",
			AdFormat::RewardedInterstitial => "rewarded_interstitial",
			AdFormat::Banner => "banner",
			AdFormat::AdaptiveBanner => "adaptive_banner",
		}
	}

	/// Whether ads of this format take over the whole screen
	pub fn is_fullscreen(&self) -> bool {
		matches!(
			self,
			AdFormat::Interstitial | AdFormat::Rewarded | AdFormat::RewardedInterstitial
		)
	}

	pub fn is_banner(&self) -> bool {
		matches!(self, AdFormat::Banner | AdFormat::AdaptiveBanner)
	}
}

impl fmt::Display for AdFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Size of an ad in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdSize {
	pub width: f64,
	pub height: f64,
}

impl AdSize {
	pub fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	/// Standard 320x50 banner
	pub fn standard() -> Self {
		Self::new(320.0, 50.0)
	}

	/// 300x250 medium rectangle
	pub fn medium() -> Self {
		Self::new(300.0, 250.0)
	}

	/// 728x90 leaderboard
	pub fn leaderboard() -> Self {
		Self::new(728.0, 90.0)
	}
}

/// A single load attempt for a placement.
///
/// Requests are immutable once built. Every attempt gets a fresh `load_id`;
/// clones share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
	placement: String,
	format: AdFormat,
	size: Option<AdSize>,
	keywords: Option<HashMap<String, String>>,
	partner_settings: Option<HashMap<String, serde_json::Value>>,
	load_id: String,
	queue_id: Option<String>,
}

impl LoadRequest {
	/// Create a request with a freshly generated load identifier
	pub fn new(placement: impl Into<String>, format: AdFormat) -> Self {
		Self {
			placement: placement.into(),
			format,
			size: None,
			keywords: None,
			partner_settings: None,
			load_id: uuid::Uuid::new_v4().to_string(),
			queue_id: None,
		}
	}

	pub fn with_size(mut self, size: AdSize) -> Self {
		self.size = Some(size);
		self
	}

	pub fn with_keywords(mut self, keywords: HashMap<String, String>) -> Self {
		self.keywords = Some(keywords);
		self
	}

	pub fn with_partner_settings(
		mut self,
		partner_settings: HashMap<String, serde_json::Value>,
	) -> Self {
		self.partner_settings = Some(partner_settings);
		self
	}

	/// Tag the request as a queue refill
	pub fn with_queue_id(mut self, queue_id: impl Into<String>) -> Self {
		self.queue_id = Some(queue_id.into());
		self
	}

	pub fn placement(&self) -> &str {
		&self.placement
	}

	pub fn format(&self) -> AdFormat {
		self.format
	}

	pub fn size(&self) -> Option<AdSize> {
		self.size
	}

	pub fn keywords(&self) -> Option<&HashMap<String, String>> {
		self.keywords.as_ref()
	}

	pub fn partner_settings(&self) -> Option<&HashMap<String, serde_json::Value>> {
		self.partner_settings.as_ref()
	}

	pub fn load_id(&self) -> &str {
		&self.load_id
	}

	pub fn queue_id(&self) -> Option<&str> {
		self.queue_id.as_deref()
	}
}
