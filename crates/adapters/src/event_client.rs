//! Delivery of queue lifecycle events

use async_trait::async_trait;
use mediation_types::{QueueEvent, QueueEventSink, TransportError};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::http_client::{build_client, build_url, parse_endpoint, ClientConfig};

/// Timeout for a single event delivery
const EVENT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Serialize)]
struct QueueEventPayload<'a> {
	#[serde(flatten)]
	event: &'a QueueEvent,
	timestamp: i64,
}

/// Posts queue started/stopped events to the backend
#[derive(Debug, Clone)]
pub struct HttpQueueEventClient {
	client: Client,
	endpoint: Url,
}

impl HttpQueueEventClient {
	pub fn new(endpoint: &str, sdk_version: &str) -> Result<Self, TransportError> {
		let endpoint = parse_endpoint(endpoint)?;
		let client = build_client(&ClientConfig::new(EVENT_TIMEOUT_MS, sdk_version))?;
		Ok(Self { client, endpoint })
	}

	async fn post(&self, path: &str, event: &QueueEvent) {
		let url = match build_url(&self.endpoint, path) {
			Ok(url) => url,
			Err(e) => {
				warn!("Cannot build queue event URL: {}", e);
				return;
			},
		};

		let payload = QueueEventPayload {
			event,
			timestamp: chrono::Utc::now().timestamp_millis(),
		};

		match self.client.post(url).json(&payload).send().await {
			Ok(response) if response.status().is_success() => {
				debug!(
					"Delivered queue {} event for placement {}",
					path, event.placement
				);
			},
			Ok(response) => {
				warn!(
					"Queue {} event for placement {} rejected with status {}",
					path,
					event.placement,
					response.status()
				);
			},
			Err(e) => {
				warn!(
					"Failed to deliver queue {} event for placement {}: {}",
					path, event.placement, e
				);
			},
		}
	}
}

#[async_trait]
impl QueueEventSink for HttpQueueEventClient {
	async fn queue_started(&self, event: QueueEvent) {
		self.post("started", &event).await;
	}

	async fn queue_stopped(&self, event: QueueEvent) {
		self.post("stopped", &event).await;
	}
}
