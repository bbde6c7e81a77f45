//! Per-placement pools of preloaded ads
//!
//! Every placement owns at most one [`AdQueue`], handed out by the
//! [`QueueRegistry`]. Queue state is only mutated under its lock, and every
//! asynchronous continuation (load results, timers, deferred starts) is
//! funnelled through the dispatcher's background queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mediation_types::constants::limits::MIN_QUEUE_CAPACITY;
use mediation_types::{MediationResult, QueueEventSink};
use thiserror::Error;

use crate::dispatch::TaskDispatcher;
use crate::init::InitializationSignal;
use crate::loader::AdLoader;

mod ad_queue;
pub mod registry;

pub use ad_queue::AdQueue;
pub use registry::QueueRegistry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
	#[error("Placement name must not be empty")]
	EmptyPlacement,
}

/// Receives pool-level notifications from a queue
pub trait AdQueueDelegate: Send + Sync {
	/// A load attempt finished
	fn did_update(&self, _placement: &str, _result: &MediationResult<()>, _ads_ready: usize) {}

	/// An ad left the pool because it expired
	fn did_remove_expired_ad(&self, _placement: &str, _ads_ready: usize) {}
}

/// Server-controlled ceiling shared by every queue
#[derive(Debug)]
pub struct QueueLimits {
	max_queue_size: AtomicUsize,
}

impl QueueLimits {
	pub fn new(max_queue_size: usize) -> Self {
		Self {
			max_queue_size: AtomicUsize::new(max_queue_size.max(MIN_QUEUE_CAPACITY)),
		}
	}

	pub fn max_queue_size(&self) -> usize {
		self.max_queue_size.load(Ordering::SeqCst)
	}

	pub fn set_max_queue_size(&self, max_queue_size: usize) {
		self.max_queue_size
			.store(max_queue_size.max(MIN_QUEUE_CAPACITY), Ordering::SeqCst);
	}

	/// Clamp a requested capacity into `[1, max_queue_size]`
	pub fn clamp(&self, requested: usize) -> usize {
		requested.clamp(MIN_QUEUE_CAPACITY, self.max_queue_size())
	}
}

/// Collaborators and tuning shared by the queues of one registry
#[derive(Clone)]
pub struct QueueContext {
	pub loader: Arc<dyn AdLoader>,
	pub dispatcher: Arc<dyn TaskDispatcher>,
	pub initialization: InitializationSignal,
	pub events: Arc<dyn QueueEventSink>,
	pub limits: Arc<QueueLimits>,
	/// Capacity a new queue asks for
	pub default_capacity: usize,
	/// Lifetime of a queued ad
	pub ttl: Duration,
	/// Fixed wait after a failed load
	pub penalty_delay: Duration,
}
