//! One ad queue per placement

use std::sync::Arc;

use dashmap::DashMap;
use mediation_config::QueueSettings;
use mediation_types::{AdFormat, QueueEventSink};
use tracing::{debug, info};

use super::{AdQueue, QueueContext, QueueError, QueueLimits};
use crate::dispatch::TaskDispatcher;
use crate::init::InitializationSignal;
use crate::loader::AdLoader;

/// Hands out the queue of a placement, creating it on first use.
///
/// Every queue created here shares the registry's [`QueueLimits`], so a
/// new ceiling from the server re-clamps all of them at once.
pub struct QueueRegistry {
	queues: DashMap<String, AdQueue>,
	context: QueueContext,
}

impl QueueRegistry {
	pub fn new(
		settings: &QueueSettings,
		loader: Arc<dyn AdLoader>,
		dispatcher: Arc<dyn TaskDispatcher>,
		initialization: InitializationSignal,
		events: Arc<dyn QueueEventSink>,
	) -> Self {
		Self {
			queues: DashMap::new(),
			context: QueueContext {
				loader,
				dispatcher,
				initialization,
				events,
				limits: Arc::new(QueueLimits::new(settings.max_queue_size)),
				default_capacity: settings.default_capacity,
				ttl: settings.ttl(),
				penalty_delay: settings.penalty_delay(),
			},
		}
	}

	/// Queue of `placement`. The format only matters when the queue is
	/// created; later calls return the existing queue unchanged.
	pub fn queue(&self, placement: &str, format: AdFormat) -> Result<AdQueue, QueueError> {
		if placement.trim().is_empty() {
			return Err(QueueError::EmptyPlacement);
		}

		let queue = self
			.queues
			.entry(placement.to_string())
			.or_insert_with(|| {
				debug!("Creating {} queue for placement {}", format, placement);
				AdQueue::new(placement, format, self.context.clone())
			})
			.clone();

		if queue.format() != format {
			debug!(
				"Placement {} already has a {} queue, ignoring requested format {}",
				placement,
				queue.format(),
				format
			);
		}
		Ok(queue)
	}

	pub fn get(&self, placement: &str) -> Option<AdQueue> {
		self.queues.get(placement).map(|queue| queue.clone())
	}

	/// Apply a new ceiling to every queue, existing and future
	pub fn set_max_queue_size(&self, max_queue_size: usize) {
		self.context.limits.set_max_queue_size(max_queue_size);
		info!(
			"Max queue size set to {} for {} queue(s)",
			self.context.limits.max_queue_size(),
			self.queues.len()
		);

		let queues: Vec<AdQueue> = self.queues.iter().map(|entry| entry.value().clone()).collect();
		for queue in queues {
			queue.limits_changed();
		}
	}

	pub fn max_queue_size(&self) -> usize {
		self.context.limits.max_queue_size()
	}

	pub fn placements(&self) -> Vec<String> {
		let mut placements: Vec<String> = self.queues.iter().map(|entry| entry.key().clone()).collect();
		placements.sort();
		placements
	}

	pub fn len(&self) -> usize {
		self.queues.len()
	}

	pub fn is_empty(&self) -> bool {
		self.queues.is_empty()
	}
}
