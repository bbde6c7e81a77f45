//! Mock auction server for integration tests
//!
//! Serves scripted responses over real HTTP so the reqwest transport is
//! exercised end to end.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ad_mediation::Settings;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

const AUCTION_PATH: &str = "/v3/auctions";

/// One scripted reply of the mock server
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
	pub status: u16,
	pub headers: Vec<(String, String)>,
	pub body: Vec<u8>,
	pub delay: Option<Duration>,
}

#[allow(dead_code)]
impl ScriptedResponse {
	/// 200 with one seat per partner, ranked in the given order
	pub fn bids(auction_id: &str, partners: &[&str]) -> Self {
		let seats: Vec<Value> = partners
			.iter()
			.enumerate()
			.map(|(rank, partner)| {
				json!({
					"seat": partner,
					"bid": [{
						"id": format!("bid-{rank}"),
						"price": 10.0 - rank as f64,
						"ext": {
							"partner_placement": format!("{partner}-placement"),
							"bidder": { "campaign": format!("{partner}-campaign") },
							"line_item_id": format!("li-{rank}")
						}
					}]
				})
			})
			.collect();
		let body = json!({ "id": auction_id, "seatbid": seats });

		Self {
			status: 200,
			headers: vec![("content-type".to_string(), "application/json".to_string())],
			body: serde_json::to_vec(&body).unwrap(),
			delay: None,
		}
		.with_header("x-mediation-auction-id", auction_id)
	}

	pub fn no_bid() -> Self {
		Self::status(204)
	}

	pub fn status(status: u16) -> Self {
		Self {
			status,
			headers: Vec::new(),
			body: Vec::new(),
			delay: None,
		}
	}

	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		self.headers.push((name.to_string(), value.to_string()));
		self
	}

	pub fn with_rate_limit(self, seconds: u64) -> Self {
		self.with_header("x-mediation-ratelimit-reset", &seconds.to_string())
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}
}

/// A bid request as the server received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
	pub headers: HashMap<String, String>,
	pub body: Value,
}

#[allow(dead_code)]
impl RecordedRequest {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).map(String::as_str)
	}
}

struct ServerState {
	script: Mutex<VecDeque<ScriptedResponse>>,
	fallback: ScriptedResponse,
	requests: Mutex<Vec<RecordedRequest>>,
}

/// Running mock auction server
pub struct MockAuctionServer {
	pub endpoint: String,
	state: Arc<ServerState>,
	handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl MockAuctionServer {
	/// Spawn a server answering with `fallback` once the script runs out
	pub async fn spawn(fallback: ScriptedResponse) -> Self {
		let state = Arc::new(ServerState {
			script: Mutex::new(VecDeque::new()),
			fallback,
			requests: Mutex::new(Vec::new()),
		});
		let app = Router::new()
			.route(AUCTION_PATH, post(handle_auction))
			.with_state(Arc::clone(&state));

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
			.await
			.expect("bind test port");
		let addr = listener.local_addr().unwrap();
		let handle = tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});

		Self {
			endpoint: format!("http://{}{}", addr, AUCTION_PATH),
			state,
			handle,
		}
	}

	/// Answer the next request with `response`
	pub fn enqueue(&self, response: ScriptedResponse) {
		self.state.script.lock().unwrap().push_back(response);
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.state.requests.lock().unwrap().clone()
	}

	pub fn request_count(&self) -> usize {
		self.state.requests.lock().unwrap().len()
	}

	/// Settings pointing the core at this server
	pub fn settings(&self) -> Settings {
		let mut settings = Settings::default();
		settings.app.app_id = "e2e-app".to_string();
		settings.auction.endpoint = self.endpoint.clone();
		settings.auction.request_timeout_ms = 2_000;
		settings.loading.load_timeout_ms = 5_000;
		settings
	}

	pub fn abort(&self) {
		self.handle.abort();
	}
}

impl Drop for MockAuctionServer {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

async fn handle_auction(
	State(state): State<Arc<ServerState>>,
	headers: HeaderMap,
	body: Bytes,
) -> Response {
	let headers = headers
		.iter()
		.filter_map(|(name, value)| {
			value
				.to_str()
				.ok()
				.map(|value| (name.as_str().to_string(), value.to_string()))
		})
		.collect();
	let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
	state
		.requests
		.lock()
		.unwrap()
		.push(RecordedRequest { headers, body });

	let scripted = state
		.script
		.lock()
		.unwrap()
		.pop_front()
		.unwrap_or_else(|| state.fallback.clone());

	if let Some(delay) = scripted.delay {
		tokio::time::sleep(delay).await;
	}

	let status = StatusCode::from_u16(scripted.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
	let mut response = (status, scripted.body).into_response();
	for (name, value) in &scripted.headers {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			response.headers_mut().insert(name, value);
		}
	}
	response
}
