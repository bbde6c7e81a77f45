//! Dispatcher backed by the tokio runtime
//!
//! Each serial queue is a single tokio task draining an unbounded channel,
//! so tasks on one queue run one at a time in submission order.

use std::cell::Cell;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::{DispatchError, DispatchQueue, Task, TaskDispatcher};

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
	/// Serial queue whose task is running on this thread
	static CURRENT_QUEUE: Cell<Option<u64>> = const { Cell::new(None) };
}

struct SerialQueue {
	id: u64,
	label: DispatchQueue,
	sender: mpsc::UnboundedSender<Task>,
}

impl SerialQueue {
	fn start(handle: &Handle, label: DispatchQueue) -> Self {
		let id = NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed);
		let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();

		handle.spawn(async move {
			debug!("Dispatch queue {:?} started", label);
			while let Some(task) = receiver.recv().await {
				run_on_queue(id, label, task);
			}
			debug!("Dispatch queue {:?} closed", label);
		});

		Self { id, label, sender }
	}

	fn is_current(&self) -> bool {
		CURRENT_QUEUE.with(|current| current.get() == Some(self.id))
	}

	fn enqueue(&self, task: Task) -> Result<(), DispatchError> {
		self.sender
			.send(task)
			.map_err(|_| DispatchError::QueueClosed(self.label))
	}
}

fn run_on_queue(id: u64, label: DispatchQueue, task: Task) {
	let previous = CURRENT_QUEUE.with(|current| current.replace(Some(id)));
	if std::panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
		error!("Task panicked on {:?} dispatch queue", label);
	}
	CURRENT_QUEUE.with(|current| current.set(previous));
}

/// Production dispatcher running on a tokio runtime
pub struct TokioDispatcher {
	handle: Handle,
	main: SerialQueue,
	background: SerialQueue,
}

impl TokioDispatcher {
	/// Start both serial queues on the given runtime
	pub fn new(handle: Handle) -> Self {
		let main = SerialQueue::start(&handle, DispatchQueue::Main);
		let background = SerialQueue::start(&handle, DispatchQueue::Background);
		Self {
			handle,
			main,
			background,
		}
	}

	/// Start on the runtime the caller is running in
	pub fn current() -> Result<Self, DispatchError> {
		Handle::try_current()
			.map(Self::new)
			.map_err(|e| DispatchError::NoRuntime(e.to_string()))
	}

	fn serial(&self, queue: DispatchQueue) -> &SerialQueue {
		match queue {
			DispatchQueue::Main => &self.main,
			DispatchQueue::Background => &self.background,
		}
	}
}

impl TaskDispatcher for TokioDispatcher {
	fn execute(&self, queue: DispatchQueue, task: Task) {
		if let Err(e) = self.serial(queue).enqueue(task) {
			error!("Failed to dispatch task: {}", e);
		}
	}

	fn execute_after(&self, queue: DispatchQueue, delay: Duration, task: Task) {
		let sender = self.serial(queue).sender.clone();
		self.handle.spawn(async move {
			tokio::time::sleep(delay).await;
			if sender.send(task).is_err() {
				debug!("Dropping delayed task for closed {:?} queue", queue);
			}
		});
	}

	fn execute_blocking(&self, queue: DispatchQueue, task: Task) -> Result<(), DispatchError> {
		let serial = self.serial(queue);
		if serial.is_current() {
			task();
			return Ok(());
		}

		let inside_runtime = match Handle::try_current() {
			Ok(handle) => {
				if !matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
					return Err(DispatchError::WouldDeadlock(queue));
				}
				true
			},
			Err(_) => false,
		};

		let (done_sender, done_receiver) = std::sync::mpsc::channel::<()>();
		serial.enqueue(Box::new(move || {
			task();
			let _ = done_sender.send(());
		}))?;

		let wait = || {
			done_receiver
				.recv()
				.map_err(|_| DispatchError::TaskDropped(queue))
		};
		if inside_runtime {
			tokio::task::block_in_place(wait)
		} else {
			wait()
		}
	}

	fn spawn(&self, future: BoxFuture<'static, ()>) {
		self.handle.spawn(future);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dispatch::TaskDispatcherExt;
	use std::sync::{Arc, Mutex};
	use tokio::sync::oneshot;

	fn dispatcher() -> Arc<dyn TaskDispatcher> {
		Arc::new(TokioDispatcher::current().unwrap())
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn test_tasks_run_in_submission_order() {
		let dispatcher = dispatcher();
		let seen = Arc::new(Mutex::new(Vec::new()));

		for i in 0..50 {
			let seen = Arc::clone(&seen);
			dispatcher.execute(
				DispatchQueue::Background,
				Box::new(move || seen.lock().unwrap().push(i)),
			);
		}
		dispatcher.sync(DispatchQueue::Background, || ()).unwrap();

		let seen = seen.lock().unwrap();
		assert_eq!(*seen, (0..50).collect::<Vec<_>>());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn test_blocking_on_own_queue_runs_inline() {
		let dispatcher = dispatcher();
		let inner = Arc::clone(&dispatcher);

		let result = dispatcher
			.sync(DispatchQueue::Background, move || {
				inner.sync(DispatchQueue::Background, || 5)
			})
			.unwrap();

		assert_eq!(result, Ok(5));
	}

	#[tokio::test]
	async fn test_blocking_on_current_thread_runtime_is_rejected() {
		let dispatcher = dispatcher();

		let result = dispatcher.execute_blocking(DispatchQueue::Main, Box::new(|| {}));
		assert_eq!(result, Err(DispatchError::WouldDeadlock(DispatchQueue::Main)));
	}

	#[tokio::test]
	async fn test_execute_after_delivers_on_queue() {
		let dispatcher = dispatcher();
		let (sender, receiver) = oneshot::channel();

		dispatcher.execute_after(
			DispatchQueue::Main,
			Duration::from_millis(20),
			Box::new(move || {
				let _ = sender.send(());
			}),
		);

		let delivered = tokio::time::timeout(Duration::from_secs(2), receiver).await;
		assert!(matches!(delivered, Ok(Ok(()))));
	}

	#[tokio::test]
	async fn test_panicking_task_does_not_stop_queue() {
		let dispatcher = dispatcher();
		let (sender, receiver) = oneshot::channel();

		dispatcher.execute(DispatchQueue::Background, Box::new(|| panic!("boom")));
		dispatcher.execute(
			DispatchQueue::Background,
			Box::new(move || {
				let _ = sender.send(());
			}),
		);

		let delivered = tokio::time::timeout(Duration::from_secs(2), receiver).await;
		assert!(matches!(delivered, Ok(Ok(()))));
	}
}
