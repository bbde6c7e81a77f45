//! Transport-level request/response shapes for the auction endpoint
//!
//! Kept free of any HTTP client so services can be tested against an
//! in-memory transport.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::bids::BidRequest;

/// Outbound bid request
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionHttpRequest {
	/// Header names are lowercase
	pub headers: HashMap<String, String>,
	pub body: BidRequest,
}

/// Raw response from the auction endpoint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuctionHttpResponse {
	pub status: u16,
	/// Header names are lowercase
	pub headers: HashMap<String, String>,
	pub body: Vec<u8>,
}

impl AuctionHttpResponse {
	pub fn new(status: u16) -> Self {
		Self {
			status,
			..Default::default()
		}
	}

	pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.headers.insert(name.to_ascii_lowercase(), value.into());
		self
	}

	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();
		self
	}

	/// Case-insensitive header lookup
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.get(&name.to_ascii_lowercase())
			.map(String::as_str)
	}
}

/// Transport failures, before any status code is seen
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
	#[error("Request timed out after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("Connection error: {0}")]
	Connection(String),

	#[error("Transport not configured: {0}")]
	NotConfigured(String),

	#[error("Failed to encode or decode payload: {0}")]
	Decode(String),

	#[error("Network error: {0}")]
	Network(String),
}

/// Sends bid requests to the auction endpoint
#[async_trait]
pub trait AuctionTransport: Send + Sync {
	/// Send one bid request. Any HTTP status is a successful send.
	async fn send(&self, request: AuctionHttpRequest)
		-> Result<AuctionHttpResponse, TransportError>;
}
