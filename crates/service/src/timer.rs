//! Pausable, resumable timer on top of the dispatcher
//!
//! The timer is an explicit state machine. Only the paused state stores a
//! remaining duration; the active state stores a deadline on the
//! dispatcher's clock, from which the remaining time is derived.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{trace, warn};

use crate::dispatch::{DispatchQueue, TaskDispatcher};
use crate::sync::lock;

/// Delays that would overflow the dispatcher clock are capped here
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Observable timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
	/// Constructed, never scheduled
	Ready,
	/// Counting down
	Active,
	/// Countdown frozen
	Paused,
	/// Fired (non-repeating) or invalidated; terminal
	Complete,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimerError {
	#[error("Cannot {operation} a timer that is {from:?}")]
	InvalidTransition {
		from: TimerState,
		operation: &'static str,
	},
}

enum Phase {
	Ready,
	Active { deadline: Instant },
	Paused { remaining: Duration },
	Complete,
}

impl Phase {
	fn state(&self) -> TimerState {
		match self {
			Phase::Ready => TimerState::Ready,
			Phase::Active { .. } => TimerState::Active,
			Phase::Paused { .. } => TimerState::Paused,
			Phase::Complete => TimerState::Complete,
		}
	}
}

struct Control {
	phase: Phase,
	/// Bumped on every arm, pause and invalidate so stale fires are ignored
	generation: u64,
}

struct TimerShared {
	interval: Duration,
	repeats: bool,
	queue: DispatchQueue,
	dispatcher: Arc<dyn TaskDispatcher>,
	action: Box<dyn Fn() + Send + Sync>,
	control: Mutex<Control>,
}

impl TimerShared {
	fn arm(shared: &Arc<TimerShared>, control: &mut Control, delay: Duration) {
		control.generation += 1;
		let generation = control.generation;
		let now = shared.dispatcher.now();
		let (deadline, delay) = match now.checked_add(delay) {
			Some(deadline) => (deadline, delay),
			None => {
				warn!("Timer delay {:?} out of range, capped at {:?}", delay, FAR_FUTURE);
				(now + FAR_FUTURE, FAR_FUTURE)
			},
		};
		control.phase = Phase::Active { deadline };

		let weak: Weak<TimerShared> = Arc::downgrade(shared);
		shared.dispatcher.execute_after(
			shared.queue,
			delay,
			Box::new(move || {
				if let Some(shared) = weak.upgrade() {
					TimerShared::fire(&shared, generation);
				}
			}),
		);
	}

	fn fire(shared: &Arc<TimerShared>, generation: u64) {
		{
			let mut control = lock(&shared.control);
			if control.generation != generation || !matches!(control.phase, Phase::Active { .. }) {
				trace!("Ignoring stale timer fire");
				return;
			}
			if shared.repeats {
				TimerShared::arm(shared, &mut control, shared.interval);
			} else {
				control.phase = Phase::Complete;
			}
		}
		(shared.action)();
	}
}

/// Handle to a countdown that runs an action on a dispatch queue.
///
/// Clones share the same timer. When the last handle is dropped, pending
/// fires become no-ops.
#[derive(Clone)]
pub struct ResumableTimer {
	shared: Arc<TimerShared>,
}

impl ResumableTimer {
	pub fn new<F>(
		interval: Duration,
		repeats: bool,
		queue: DispatchQueue,
		dispatcher: Arc<dyn TaskDispatcher>,
		action: F,
	) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		Self {
			shared: Arc::new(TimerShared {
				interval,
				repeats,
				queue,
				dispatcher,
				action: Box::new(action),
				control: Mutex::new(Control {
					phase: Phase::Ready,
					generation: 0,
				}),
			}),
		}
	}

	/// Start counting down, or resume with the time left when paused
	pub fn schedule_now(&self) -> Result<(), TimerError> {
		let mut control = lock(&self.shared.control);
		let delay = match control.phase {
			Phase::Ready => self.shared.interval,
			Phase::Paused { remaining } => remaining,
			ref other => {
				return Err(TimerError::InvalidTransition {
					from: other.state(),
					operation: "schedule",
				})
			},
		};
		TimerShared::arm(&self.shared, &mut control, delay);
		Ok(())
	}

	/// Freeze the countdown
	pub fn pause(&self) -> Result<(), TimerError> {
		let mut control = lock(&self.shared.control);
		match control.phase {
			Phase::Active { deadline } => {
				let remaining = deadline.saturating_duration_since(self.shared.dispatcher.now());
				control.generation += 1;
				control.phase = Phase::Paused { remaining };
				Ok(())
			},
			ref other => Err(TimerError::InvalidTransition {
				from: other.state(),
				operation: "pause",
			}),
		}
	}

	/// Stop for good. Safe to call in any state.
	pub fn invalidate(&self) {
		let mut control = lock(&self.shared.control);
		control.generation += 1;
		control.phase = Phase::Complete;
	}

	pub fn state(&self) -> TimerState {
		lock(&self.shared.control).phase.state()
	}

	/// Time left before the next fire
	pub fn remaining(&self) -> Duration {
		match lock(&self.shared.control).phase {
			Phase::Ready => self.shared.interval,
			Phase::Active { deadline } => {
				deadline.saturating_duration_since(self.shared.dispatcher.now())
			},
			Phase::Paused { remaining } => remaining,
			Phase::Complete => Duration::ZERO,
		}
	}

	pub fn interval(&self) -> Duration {
		self.shared.interval
	}
}

impl fmt::Debug for ResumableTimer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResumableTimer")
			.field("interval", &self.shared.interval)
			.field("repeats", &self.shared.repeats)
			.field("state", &self.state())
			.finish()
	}
}
