//! Configuration loading utilities

use config::{Config, ConfigError, Environment, File};
use thiserror::Error;

use crate::{ConfigValidationError, Settings};

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigLoadError {
	#[error("Failed to read configuration: {0}")]
	Source(#[from] ConfigError),

	#[error("Invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),
}

/// Load configuration from `config/config.*` and `MEDIATION__*` environment variables
pub fn load_config() -> Result<Settings, ConfigLoadError> {
	load_config_from("config/config")
}

/// Load configuration from an explicit file stem, then environment overrides
pub fn load_config_from(path: &str) -> Result<Settings, ConfigLoadError> {
	let s = Config::builder()
		.add_source(File::with_name(path).required(false))
		.add_source(
			Environment::with_prefix("MEDIATION")
				.separator("__")
				.try_parsing(true),
		)
		.build()?;

	let settings: Settings = s.try_deserialize()?;
	settings.validate()?;
	Ok(settings)
}
