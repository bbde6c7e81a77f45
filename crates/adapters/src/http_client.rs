//! Shared HTTP client construction
//!
//! Both the auction transport and the event client talk to the same
//! backend, so they share pooling and keep-alive settings.

use std::time::Duration;

use mediation_types::TransportError;
use reqwest::{Client, ClientBuilder};
use url::Url;

/// Configuration for creating HTTP clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	/// Request timeout
	pub timeout_ms: u64,
	/// Maximum number of idle connections per host
	pub max_idle_per_host: usize,
	/// Connection keep-alive timeout
	pub keep_alive_timeout_ms: u64,
	/// Headers attached to every request
	pub headers: Vec<(String, String)>,
}

impl ClientConfig {
	pub fn new(timeout_ms: u64, sdk_version: &str) -> Self {
		Self {
			timeout_ms,
			max_idle_per_host: 4,
			keep_alive_timeout_ms: 90_000, // 90 seconds keep-alive
			headers: vec![
				(
					"User-Agent".to_string(),
					format!("AdMediation-Core/{}", sdk_version),
				),
				("Content-Type".to_string(), "application/json".to_string()),
			],
		}
	}
}

/// Create an HTTP client for the given configuration
pub fn build_client(config: &ClientConfig) -> Result<Client, TransportError> {
	let mut header_map = reqwest::header::HeaderMap::new();
	for (key, value) in &config.headers {
		if let (Ok(header_name), Ok(header_value)) = (
			reqwest::header::HeaderName::from_bytes(key.as_bytes()),
			reqwest::header::HeaderValue::from_str(value),
		) {
			header_map.insert(header_name, header_value);
		}
	}

	ClientBuilder::new()
		.timeout(Duration::from_millis(config.timeout_ms))
		.pool_max_idle_per_host(config.max_idle_per_host)
		.pool_idle_timeout(Duration::from_millis(config.keep_alive_timeout_ms))
		.tcp_keepalive(Duration::from_secs(60))
		.default_headers(header_map)
		.build()
		.map_err(|e| TransportError::NotConfigured(format!("Failed to build HTTP client: {}", e)))
}

/// Parse an endpoint, rejecting anything that is not http(s)
pub fn parse_endpoint(endpoint: &str) -> Result<Url, TransportError> {
	let url = Url::parse(endpoint).map_err(|e| {
		TransportError::NotConfigured(format!("Invalid endpoint '{}': {}", endpoint, e))
	})?;

	match url.scheme() {
		"http" | "https" => Ok(url),
		scheme => Err(TransportError::NotConfigured(format!(
			"Unsupported scheme '{}' for endpoint '{}'",
			scheme, endpoint
		))),
	}
}

/// Join a relative path onto a base URL, treating the base as a directory
pub fn build_url(base: &Url, path: &str) -> Result<Url, TransportError> {
	let mut base = base.clone();
	if !base.path().ends_with('/') {
		base.set_path(&format!("{}/", base.path()));
	}

	base.join(path).map_err(|e| {
		TransportError::NotConfigured(format!(
			"Failed to join URL path '{}' to base '{}': {}",
			path, base, e
		))
	})
}

/// Classify a reqwest failure
pub fn map_reqwest_error(error: reqwest::Error, timeout_ms: u64) -> TransportError {
	if error.is_timeout() {
		TransportError::Timeout { timeout_ms }
	} else if error.is_connect() {
		TransportError::Connection(error.to_string())
	} else if error.is_decode() || error.is_body() {
		TransportError::Decode(error.to_string())
	} else if error.is_builder() {
		TransportError::NotConfigured(error.to_string())
	} else {
		TransportError::Network(error.to_string())
	}
}
