//! Queue lifecycle events reported to the backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snapshot of a queue at a lifecycle transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
	pub placement: String,
	pub queue_id: String,
	pub queue_capacity: usize,
	pub actual_max_queue_size: usize,
	pub ads_ready: usize,
}

/// Receives queue started/stopped notifications.
///
/// Delivery is fire-and-forget: implementations log failures and never
/// report them back to the queue.
#[async_trait]
pub trait QueueEventSink: Send + Sync {
	async fn queue_started(&self, event: QueueEvent);

	async fn queue_stopped(&self, event: QueueEvent);
}

/// Sink used when no events endpoint is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopQueueEventSink;

#[async_trait]
impl QueueEventSink for NoopQueueEventSink {
	async fn queue_started(&self, _event: QueueEvent) {}

	async fn queue_stopped(&self, _event: QueueEvent) {}
}
