//! Serial task dispatching
//!
//! Two serial FIFO sequences exist: `Main` for anything handed back to the
//! embedding application and `Background` for internal state mutation. Work
//! on one sequence never overlaps, which is what the ad queue relies on for
//! single-writer updates. I/O-bound futures run off the sequences through
//! [`TaskDispatcher::spawn`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use thiserror::Error;

use crate::timer::ResumableTimer;

pub mod group;
pub mod immediate;
pub mod runtime;

pub use group::{GroupOutcome, TaskGroup};
pub use immediate::ImmediateDispatcher;
pub use runtime::TokioDispatcher;

/// Unit of work run on a dispatch queue
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The serial sequences a dispatcher offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchQueue {
	Main,
	Background,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
	#[error("Dispatch queue {0:?} is closed")]
	QueueClosed(DispatchQueue),

	#[error("Task on {0:?} was dropped before completing")]
	TaskDropped(DispatchQueue),

	#[error("Blocking on {0:?} from a single-threaded runtime would deadlock")]
	WouldDeadlock(DispatchQueue),

	#[error("No async runtime available: {0}")]
	NoRuntime(String),
}

/// Runs closures on serial queues, immediately or after a delay
pub trait TaskDispatcher: Send + Sync {
	/// Enqueue a task and return immediately
	fn execute(&self, queue: DispatchQueue, task: Task);

	/// Enqueue a task once `delay` has elapsed
	fn execute_after(&self, queue: DispatchQueue, delay: Duration, task: Task);

	/// Run a task on the queue and wait for it to finish.
	///
	/// Called from a task already running on the same queue, the task runs
	/// inline. Cross-queue cycles of blocking calls still deadlock.
	fn execute_blocking(&self, queue: DispatchQueue, task: Task) -> Result<(), DispatchError>;

	/// Drive an I/O-bound future outside the serial queues
	fn spawn(&self, future: BoxFuture<'static, ()>);

	/// Clock used for timer deadlines
	fn now(&self) -> Instant {
		Instant::now()
	}
}

/// Convenience helpers over a shared dispatcher
pub trait TaskDispatcherExt {
	/// Run `work` on the queue, block until done and hand back its result
	fn sync<T, F>(&self, queue: DispatchQueue, work: F) -> Result<T, DispatchError>
	where
		T: Send + 'static,
		F: FnOnce() -> T + Send + 'static;

	/// Timer running `work` every `interval` (or once), already scheduled
	fn repeating<F>(
		&self,
		queue: DispatchQueue,
		interval: Duration,
		repeats: bool,
		work: F,
	) -> ResumableTimer
	where
		F: Fn() + Send + Sync + 'static;

	/// Joinable set of futures whose completion is reported on `queue`
	fn group(&self, queue: DispatchQueue) -> TaskGroup;
}

impl TaskDispatcherExt for Arc<dyn TaskDispatcher> {
	fn sync<T, F>(&self, queue: DispatchQueue, work: F) -> Result<T, DispatchError>
	where
		T: Send + 'static,
		F: FnOnce() -> T + Send + 'static,
	{
		let (sender, receiver) = std::sync::mpsc::channel();
		self.execute_blocking(
			queue,
			Box::new(move || {
				let _ = sender.send(work());
			}),
		)?;
		receiver
			.try_recv()
			.map_err(|_| DispatchError::TaskDropped(queue))
	}

	fn repeating<F>(
		&self,
		queue: DispatchQueue,
		interval: Duration,
		repeats: bool,
		work: F,
	) -> ResumableTimer
	where
		F: Fn() + Send + Sync + 'static,
	{
		let timer = ResumableTimer::new(interval, repeats, queue, Arc::clone(self), work);
		// A fresh timer is always Ready, so scheduling cannot fail
		let _ = timer.schedule_now();
		timer
	}

	fn group(&self, queue: DispatchQueue) -> TaskGroup {
		TaskGroup::new(queue, Arc::clone(self))
	}
}
