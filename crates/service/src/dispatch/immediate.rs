//! Deterministic dispatcher for tests and synchronous embedding
//!
//! `execute` runs the task inline. Delayed tasks are parked against a
//! virtual clock that only moves when [`ImmediateDispatcher::advance`] or
//! [`ImmediateDispatcher::run_delayed`] is called.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::runtime::Handle;

use super::{DispatchError, DispatchQueue, Task, TaskDispatcher};
use crate::sync::lock;

struct ParkedTask {
	due: Duration,
	sequence: u64,
	queue: DispatchQueue,
	task: Task,
}

struct VirtualClock {
	origin: Instant,
	elapsed: Duration,
}

pub struct ImmediateDispatcher {
	clock: Mutex<VirtualClock>,
	parked: Mutex<Vec<ParkedTask>>,
	next_sequence: AtomicU64,
}

impl ImmediateDispatcher {
	pub fn new() -> Self {
		Self {
			clock: Mutex::new(VirtualClock {
				origin: Instant::now(),
				elapsed: Duration::ZERO,
			}),
			parked: Mutex::new(Vec::new()),
			next_sequence: AtomicU64::new(0),
		}
	}

	/// Number of delayed tasks waiting for the clock
	pub fn pending_delayed(&self) -> usize {
		lock(&self.parked).len()
	}

	/// Delay until the earliest parked task is due
	pub fn next_delay(&self) -> Option<Duration> {
		let elapsed = lock(&self.clock).elapsed;
		lock(&self.parked)
			.iter()
			.map(|parked| parked.due.saturating_sub(elapsed))
			.min()
	}

	/// Move the virtual clock forward, running every task that falls due in
	/// deadline order. Tasks scheduled by those tasks run too when they fall
	/// inside the window. Returns how many tasks ran.
	pub fn advance(&self, by: Duration) -> usize {
		let target = lock(&self.clock).elapsed + by;
		let mut ran = 0;

		while let Some(parked) = self.pop_due(target) {
			{
				let mut clock = lock(&self.clock);
				clock.elapsed = clock.elapsed.max(parked.due);
			}
			tracing::trace!("Running delayed task on {:?}", parked.queue);
			(parked.task)();
			ran += 1;
		}

		lock(&self.clock).elapsed = target;
		ran
	}

	/// Run the tasks parked right now, whatever their delay.
	///
	/// The clock jumps to each task's deadline. Tasks they schedule stay
	/// parked.
	pub fn run_delayed(&self) -> usize {
		let mut snapshot: Vec<ParkedTask> = lock(&self.parked).drain(..).collect();
		snapshot.sort_by_key(|parked| (parked.due, parked.sequence));

		let ran = snapshot.len();
		for parked in snapshot {
			{
				let mut clock = lock(&self.clock);
				clock.elapsed = clock.elapsed.max(parked.due);
			}
			(parked.task)();
		}
		ran
	}

	fn pop_due(&self, target: Duration) -> Option<ParkedTask> {
		let mut parked = lock(&self.parked);
		let index = parked
			.iter()
			.enumerate()
			.filter(|(_, candidate)| candidate.due <= target)
			.min_by_key(|(_, candidate)| (candidate.due, candidate.sequence))
			.map(|(index, _)| index)?;
		Some(parked.remove(index))
	}
}

impl Default for ImmediateDispatcher {
	fn default() -> Self {
		Self::new()
	}
}

impl TaskDispatcher for ImmediateDispatcher {
	fn execute(&self, _queue: DispatchQueue, task: Task) {
		task();
	}

	fn execute_after(&self, queue: DispatchQueue, delay: Duration, task: Task) {
		let due = lock(&self.clock).elapsed.saturating_add(delay);
		let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
		lock(&self.parked).push(ParkedTask {
			due,
			sequence,
			queue,
			task,
		});
	}

	fn execute_blocking(&self, _queue: DispatchQueue, task: Task) -> Result<(), DispatchError> {
		task();
		Ok(())
	}

	fn spawn(&self, future: BoxFuture<'static, ()>) {
		match Handle::try_current() {
			Ok(handle) => {
				handle.spawn(future);
			},
			Err(_) => futures::executor::block_on(future),
		}
	}

	fn now(&self) -> Instant {
		let clock = lock(&self.clock);
		clock.origin + clock.elapsed
	}
}
