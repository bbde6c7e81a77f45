//! Configuration settings structures

use std::time::Duration;

use mediation_types::constants::limits::{
	DEFAULT_AUCTION_TIMEOUT_MS, DEFAULT_LOAD_RATE_LIMIT_SECS, DEFAULT_LOAD_TIMEOUT_MS,
	DEFAULT_MAX_QUEUE_SIZE, DEFAULT_PARTNER_TOKEN_TIMEOUT_MS, DEFAULT_QUEUED_AD_TTL_SECS,
	DEFAULT_QUEUE_CAPACITY, DEFAULT_QUEUE_PENALTY_DELAY_SECS, MAX_QUEUE_TIMER_SECS,
	MIN_QUEUE_CAPACITY,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for loaded settings
#[derive(Error, Debug, PartialEq)]
pub enum ConfigValidationError {
	#[error("Missing required setting: {field}")]
	MissingField { field: String },

	#[error("Invalid value for {field}: {reason}")]
	InvalidValue { field: String, reason: String },
}

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	pub app: AppSettings,
	pub auction: AuctionSettings,
	pub loading: LoadingSettings,
	pub queue: QueueSettings,
	pub logging: LoggingSettings,
}

/// Identity of the embedding application
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppSettings {
	pub app_id: String,
	pub sdk_version: String,
}

impl Default for AppSettings {
	fn default() -> Self {
		Self {
			app_id: String::new(),
			sdk_version: env!("CARGO_PKG_VERSION").to_string(),
		}
	}
}

/// Auction endpoint configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuctionSettings {
	pub endpoint: String,
	/// Timeout of a single bid request
	pub request_timeout_ms: u64,
	/// Honor server-advised load cooldowns
	pub rate_limiting_enabled: bool,
	/// Rate limit echoed to the server until it advises one
	pub default_rate_limit_secs: u64,
}

impl Default for AuctionSettings {
	fn default() -> Self {
		Self {
			endpoint: "https://mediation.example.com/v3/auctions".to_string(),
			request_timeout_ms: DEFAULT_AUCTION_TIMEOUT_MS,
			rate_limiting_enabled: true,
			default_rate_limit_secs: DEFAULT_LOAD_RATE_LIMIT_SECS,
		}
	}
}

impl AuctionSettings {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	pub fn default_rate_limit(&self) -> Duration {
		Duration::from_secs(self.default_rate_limit_secs)
	}
}

/// Load pipeline timing
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoadingSettings {
	/// Overall budget for auction plus waterfall
	pub load_timeout_ms: u64,
	/// Budget for collecting bidder tokens from all partners
	pub partner_token_timeout_ms: u64,
}

impl Default for LoadingSettings {
	fn default() -> Self {
		Self {
			load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
			partner_token_timeout_ms: DEFAULT_PARTNER_TOKEN_TIMEOUT_MS,
		}
	}
}

impl LoadingSettings {
	pub fn load_timeout(&self) -> Duration {
		Duration::from_millis(self.load_timeout_ms)
	}

	pub fn partner_token_timeout(&self) -> Duration {
		Duration::from_millis(self.partner_token_timeout_ms)
	}
}

/// Ad queue configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct QueueSettings {
	/// Server-controlled ceiling for any queue's capacity
	pub max_queue_size: usize,
	/// Capacity a queue starts with
	pub default_capacity: usize,
	/// Time-to-live of a queued ad
	pub ttl_secs: u64,
	/// Fixed wait after a failed queue load
	pub penalty_delay_secs: u64,
	/// Backend endpoint for queue started/stopped events
	pub events_endpoint: Option<String>,
}

impl Default for QueueSettings {
	fn default() -> Self {
		Self {
			max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
			default_capacity: DEFAULT_QUEUE_CAPACITY,
			ttl_secs: DEFAULT_QUEUED_AD_TTL_SECS,
			penalty_delay_secs: DEFAULT_QUEUE_PENALTY_DELAY_SECS,
			events_endpoint: None,
		}
	}
}

impl QueueSettings {
	pub fn ttl(&self) -> Duration {
		Duration::from_secs(self.ttl_secs)
	}

	pub fn penalty_delay(&self) -> Duration {
		Duration::from_secs(self.penalty_delay_secs)
	}
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
	pub structured: bool,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
			structured: false,
		}
	}
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

impl Settings {
	/// Validate cross-field constraints
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		if self.auction.endpoint.trim().is_empty() {
			return Err(ConfigValidationError::MissingField {
				field: "auction.endpoint".to_string(),
			});
		}

		for (field, value) in [
			("auction.request_timeout_ms", self.auction.request_timeout_ms),
			("loading.load_timeout_ms", self.loading.load_timeout_ms),
			(
				"loading.partner_token_timeout_ms",
				self.loading.partner_token_timeout_ms,
			),
		] {
			if value == 0 {
				return Err(ConfigValidationError::InvalidValue {
					field: field.to_string(),
					reason: "must be greater than zero".to_string(),
				});
			}
		}

		for (field, value) in [
			("queue.ttl_secs", self.queue.ttl_secs),
			("queue.penalty_delay_secs", self.queue.penalty_delay_secs),
		] {
			if value > MAX_QUEUE_TIMER_SECS {
				return Err(ConfigValidationError::InvalidValue {
					field: field.to_string(),
					reason: format!("must be at most {} seconds", MAX_QUEUE_TIMER_SECS),
				});
			}
		}

		if self.queue.max_queue_size < MIN_QUEUE_CAPACITY {
			return Err(ConfigValidationError::InvalidValue {
				field: "queue.max_queue_size".to_string(),
				reason: format!("must be at least {}", MIN_QUEUE_CAPACITY),
			});
		}

		if self.queue.default_capacity > self.queue.max_queue_size {
			return Err(ConfigValidationError::InvalidValue {
				field: "queue.default_capacity".to_string(),
				reason: format!(
					"{} exceeds max_queue_size {}",
					self.queue.default_capacity, self.queue.max_queue_size
				),
			});
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_settings_are_valid() {
		let settings = Settings::default();
		assert!(settings.validate().is_ok());
		assert!(settings.auction.rate_limiting_enabled);
		assert_eq!(settings.queue.max_queue_size, DEFAULT_MAX_QUEUE_SIZE);
		assert_eq!(settings.queue.penalty_delay(), Duration::from_secs(60));
	}

	#[test]
	fn test_rejects_capacity_above_max() {
		let mut settings = Settings::default();
		settings.queue.max_queue_size = 2;
		settings.queue.default_capacity = 3;

		let error = settings.validate().unwrap_err();
		assert!(matches!(
			error,
			ConfigValidationError::InvalidValue { ref field, .. } if field == "queue.default_capacity"
		));
	}

	#[test]
	fn test_rejects_zero_timeouts_and_empty_endpoint() {
		let mut settings = Settings::default();
		settings.loading.load_timeout_ms = 0;
		assert!(settings.validate().is_err());

		let mut settings = Settings::default();
		settings.auction.endpoint = "  ".to_string();
		assert_eq!(
			settings.validate(),
			Err(ConfigValidationError::MissingField {
				field: "auction.endpoint".to_string()
			})
		);
	}

	#[test]
	fn test_rejects_unbounded_queue_timers() {
		let mut settings = Settings::default();
		settings.queue.ttl_secs = u64::MAX;
		assert_eq!(
			settings.validate(),
			Err(ConfigValidationError::InvalidValue {
				field: "queue.ttl_secs".to_string(),
				reason: format!("must be at most {} seconds", MAX_QUEUE_TIMER_SECS),
			})
		);

		let mut settings = Settings::default();
		settings.queue.penalty_delay_secs = MAX_QUEUE_TIMER_SECS + 1;
		assert!(matches!(
			settings.validate(),
			Err(ConfigValidationError::InvalidValue { ref field, .. }) if field == "queue.penalty_delay_secs"
		));

		settings.queue.penalty_delay_secs = MAX_QUEUE_TIMER_SECS;
		assert!(settings.validate().is_ok());
	}

	#[test]
	fn test_partial_json_fills_defaults() {
		let settings: Settings = serde_json::from_str(
			r#"{ "queue": { "max_queue_size": 2 }, "logging": { "format": "json" } }"#,
		)
		.unwrap();

		assert_eq!(settings.queue.max_queue_size, 2);
		assert_eq!(settings.queue.default_capacity, DEFAULT_QUEUE_CAPACITY);
		assert_eq!(settings.logging.format, LogFormat::Json);
		assert_eq!(settings.logging.level, "info");
	}
}
