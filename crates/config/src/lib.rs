//! Mediation Configuration
//!
//! Configuration management and startup utilities for the ad mediation core.

pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use loader::{load_config, load_config_from, ConfigLoadError};
pub use settings::{
	AppSettings, AuctionSettings, ConfigValidationError, LoadingSettings, LogFormat,
	LoggingSettings, QueueSettings, Settings,
};
pub use startup_logger::{log_service_info, log_service_shutdown, log_settings};
