//! HTTP transport for bid requests

use std::collections::HashMap;

use async_trait::async_trait;
use mediation_config::{AppSettings, AuctionSettings};
use mediation_types::{AuctionHttpRequest, AuctionHttpResponse, AuctionTransport, TransportError};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::http_client::{build_client, map_reqwest_error, parse_endpoint, ClientConfig};

/// Posts bid requests to the configured auction endpoint
#[derive(Debug, Clone)]
pub struct HttpAuctionTransport {
	client: Client,
	endpoint: Url,
	app_id: String,
	timeout_ms: u64,
}

impl HttpAuctionTransport {
	pub fn new(auction: &AuctionSettings, app: &AppSettings) -> Result<Self, TransportError> {
		let endpoint = parse_endpoint(&auction.endpoint)?;
		let client = build_client(&ClientConfig::new(
			auction.request_timeout_ms,
			&app.sdk_version,
		))?;

		Ok(Self {
			client,
			endpoint,
			app_id: app.app_id.clone(),
			timeout_ms: auction.request_timeout_ms,
		})
	}

	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}

#[async_trait]
impl AuctionTransport for HttpAuctionTransport {
	async fn send(
		&self,
		request: AuctionHttpRequest,
	) -> Result<AuctionHttpResponse, TransportError> {
		if self.app_id.is_empty() {
			return Err(TransportError::NotConfigured(
				"app_id is not configured".to_string(),
			));
		}

		debug!(
			"Sending bid request to {} (load_id: {})",
			self.endpoint, request.body.ext.load_id
		);

		let mut builder = self
			.client
			.post(self.endpoint.clone())
			.header("x-mediation-app-id", &self.app_id);
		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		let response = builder
			.json(&request.body)
			.send()
			.await
			.map_err(|e| map_reqwest_error(e, self.timeout_ms))?;

		let status = response.status().as_u16();
		let headers: HashMap<String, String> = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value
					.to_str()
					.ok()
					.map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
			})
			.collect();
		let body = response
			.bytes()
			.await
			.map_err(|e| map_reqwest_error(e, self.timeout_ms))?
			.to_vec();

		debug!(
			"Auction endpoint returned status {} ({} bytes)",
			status,
			body.len()
		);

		Ok(AuctionHttpResponse {
			status,
			headers,
			body,
		})
	}
}
