//! Shared mocks and fixtures for the integration tests

pub mod adapters;
pub mod auction_server;

#[allow(unused_imports)]
pub use adapters::{bids_for, PartnerSet, RecordingEventSink};
#[allow(unused_imports)]
pub use auction_server::{MockAuctionServer, ScriptedResponse};

use std::time::Duration;

/// Poll `condition` until it holds or `timeout` elapses
#[allow(dead_code)]
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
	F: FnMut() -> bool,
{
	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		if condition() {
			return true;
		}
		if tokio::time::Instant::now() >= deadline {
			return false;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
}
