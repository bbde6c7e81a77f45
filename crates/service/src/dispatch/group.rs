//! Joinable sets of futures with a shared deadline

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use tracing::debug;

use super::{DispatchQueue, TaskDispatcher};

/// How a group finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
	/// Every member future finished
	Completed,
	/// The deadline passed first; unfinished members were dropped
	TimedOut,
}

/// A set of futures polled concurrently under one timeout
pub struct TaskGroup {
	queue: DispatchQueue,
	dispatcher: Arc<dyn TaskDispatcher>,
	tasks: Vec<BoxFuture<'static, ()>>,
}

impl TaskGroup {
	pub fn new(queue: DispatchQueue, dispatcher: Arc<dyn TaskDispatcher>) -> Self {
		Self {
			queue,
			dispatcher,
			tasks: Vec::new(),
		}
	}

	pub fn add<F>(&mut self, task: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		self.tasks.push(Box::pin(task));
	}

	pub fn len(&self) -> usize {
		self.tasks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}

	/// Wait for every member or the timeout, whichever comes first
	pub async fn join(self, timeout: Duration) -> GroupOutcome {
		let count = self.tasks.len();
		match tokio::time::timeout(timeout, join_all(self.tasks)).await {
			Ok(_) => GroupOutcome::Completed,
			Err(_) => {
				debug!("Task group of {} timed out after {:?}", count, timeout);
				GroupOutcome::TimedOut
			},
		}
	}

	/// Join in the background and hand the outcome to `completion` on the
	/// group's queue
	pub fn notify<F>(self, timeout: Duration, completion: F)
	where
		F: FnOnce(GroupOutcome) + Send + 'static,
	{
		let dispatcher = Arc::clone(&self.dispatcher);
		let queue = self.queue;
		let notifier = Arc::clone(&dispatcher);
		dispatcher.spawn(Box::pin(async move {
			let outcome = self.join(timeout).await;
			notifier.execute(queue, Box::new(move || completion(outcome)));
		}));
	}
}
