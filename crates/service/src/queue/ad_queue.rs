//! Ad queue state machine

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use mediation_types::{
	AdFormat, LoadRequest, LoadedAd, MediationResult, PartnerAdDelegate, QueueEvent,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AdQueueDelegate, QueueContext};
use crate::dispatch::DispatchQueue;
use crate::sync::lock;
use crate::timer::ResumableTimer;

struct QueuedAd {
	entry_id: u64,
	ad: LoadedAd,
	expiration: ResumableTimer,
}

struct QueueState {
	running: bool,
	/// Start requested before initialization completed
	start_pending: bool,
	/// Identifier of the current, or last, running period
	queue_id: Option<String>,
	/// Capacity as asked for; the effective capacity is clamped on read
	requested_capacity: usize,
	/// Oldest first
	ads: VecDeque<QueuedAd>,
	load_in_flight: bool,
	penalty: Option<ResumableTimer>,
	next_entry_id: u64,
}

enum Lifecycle {
	Started,
	Stopped,
}

struct QueueInner {
	placement: String,
	format: AdFormat,
	context: QueueContext,
	delegate: Mutex<Option<Arc<dyn AdQueueDelegate>>>,
	state: Mutex<QueueState>,
}

impl QueueInner {
	fn capacity(&self, state: &QueueState) -> usize {
		self.context.limits.clamp(state.requested_capacity)
	}

	fn snapshot(&self, state: &QueueState) -> QueueEvent {
		QueueEvent {
			placement: self.placement.clone(),
			queue_id: state.queue_id.clone().unwrap_or_default(),
			queue_capacity: self.capacity(state),
			actual_max_queue_size: self.context.limits.max_queue_size(),
			ads_ready: state.ads.len(),
		}
	}

	/// Run `work` on the background queue with a handle to this queue
	fn on_background<F>(self: &Arc<Self>, work: F)
	where
		F: FnOnce(&Arc<QueueInner>) + Send + 'static,
	{
		let inner = Arc::clone(self);
		self.context
			.dispatcher
			.execute(DispatchQueue::Background, Box::new(move || work(&inner)));
	}

	fn notify(&self, callback: impl FnOnce(&dyn AdQueueDelegate)) {
		let delegate = lock(&self.delegate).clone();
		if let Some(delegate) = delegate {
			callback(delegate.as_ref());
		}
	}

	fn start(self: &Arc<Self>) {
		let deferred = {
			let mut state = lock(&self.state);
			if state.running || state.start_pending {
				return;
			}
			if self.context.initialization.is_complete() {
				false
			} else {
				state.start_pending = true;
				true
			}
		};

		if !deferred {
			self.begin_running();
			return;
		}

		info!(
			"Queue for placement {} will start once initialization completes",
			self.placement
		);
		let inner = Arc::clone(self);
		let initialization = self.context.initialization.clone();
		self.context.dispatcher.spawn(Box::pin(async move {
			initialization.wait().await;
			inner.on_background(QueueInner::resume_deferred_start);
		}));
	}

	fn resume_deferred_start(self: &Arc<Self>) {
		let pending = std::mem::replace(&mut lock(&self.state).start_pending, false);
		if pending {
			self.begin_running();
		}
	}

	fn begin_running(self: &Arc<Self>) {
		let event = {
			let mut state = lock(&self.state);
			if state.running {
				return;
			}
			state.running = true;
			state.start_pending = false;
			state.queue_id = Some(Uuid::new_v4().to_string());
			self.snapshot(&state)
		};

		info!(
			"Queue for placement {} started (queue id {}, capacity {})",
			self.placement, event.queue_id, event.queue_capacity
		);
		self.emit(Lifecycle::Started, event);
		self.fill();
	}

	fn stop(self: &Arc<Self>) {
		let event = {
			let mut state = lock(&self.state);
			if state.start_pending {
				state.start_pending = false;
				info!("Deferred start of queue for placement {} cancelled", self.placement);
				return;
			}
			if !state.running {
				return;
			}
			state.running = false;
			self.snapshot(&state)
		};

		info!(
			"Queue for placement {} stopped with {} ad(s) ready",
			self.placement, event.ads_ready
		);
		self.emit(Lifecycle::Stopped, event);
	}

	fn emit(&self, lifecycle: Lifecycle, event: QueueEvent) {
		let events = Arc::clone(&self.context.events);
		self.context.dispatcher.spawn(Box::pin(async move {
			match lifecycle {
				Lifecycle::Started => events.queue_started(event).await,
				Lifecycle::Stopped => events.queue_stopped(event).await,
			}
		}));
	}

	/// Issue one load if the queue is running, below capacity and idle
	fn fill(self: &Arc<Self>) {
		let request = {
			let mut state = lock(&self.state);
			if !state.running
				|| state.load_in_flight
				|| state.penalty.is_some()
				|| state.ads.len() >= self.capacity(&state)
			{
				return;
			}
			state.load_in_flight = true;

			let request = LoadRequest::new(self.placement.clone(), self.format);
			match &state.queue_id {
				Some(queue_id) => request.with_queue_id(queue_id.clone()),
				None => request,
			}
		};

		debug!(
			"Queue for placement {} loading ad {}",
			self.placement,
			request.load_id()
		);
		let inner = Arc::clone(self);
		let observer: Arc<dyn PartnerAdDelegate> = Arc::new(ExpirationObserver {
			queue: Arc::downgrade(self),
		});
		self.context.dispatcher.spawn(Box::pin(async move {
			let result = inner.context.loader.load(request, Some(observer)).await;
			inner.on_background(move |queue| queue.finish_load(result));
		}));
	}

	fn finish_load(self: &Arc<Self>, result: MediationResult<LoadedAd>) {
		let (outcome, ads_ready) = {
			let mut state = lock(&self.state);
			state.load_in_flight = false;

			let outcome = match result {
				Ok(ad) => {
					if state.ads.len() < self.capacity(&state) {
						let entry_id = state.next_entry_id;
						state.next_entry_id += 1;
						info!(
							"Queued ad {} from {} for placement {}",
							ad.load_id(),
							ad.partner_id(),
							self.placement
						);
						let expiration = self.expiration_timer(entry_id);
						state.ads.push_back(QueuedAd {
							entry_id,
							ad,
							expiration,
						});
					} else {
						debug!(
							"Queue for placement {} is full, discarding ad {}",
							self.placement,
							ad.load_id()
						);
						ad.partner_ad.invalidate();
					}
					Ok(())
				},
				Err(e) => {
					warn!(
						"Queue load for placement {} failed, retrying in {:?}: {}",
						self.placement, self.context.penalty_delay, e
					);
					state.penalty = Some(self.penalty_timer());
					Err(e)
				},
			};
			(outcome, state.ads.len())
		};

		self.notify(|delegate| delegate.did_update(&self.placement, &outcome, ads_ready));
		self.fill();
	}

	fn expiration_timer(self: &Arc<Self>, entry_id: u64) -> ResumableTimer {
		let queue = Arc::downgrade(self);
		self.scheduled_timer(self.context.ttl, move || {
			if let Some(queue) = queue.upgrade() {
				queue.expire_entry(entry_id);
			}
		})
	}

	fn penalty_timer(self: &Arc<Self>) -> ResumableTimer {
		let queue = Arc::downgrade(self);
		self.scheduled_timer(self.context.penalty_delay, move || {
			if let Some(queue) = queue.upgrade() {
				queue.penalty_elapsed();
			}
		})
	}

	fn scheduled_timer<F>(&self, delay: std::time::Duration, action: F) -> ResumableTimer
	where
		F: Fn() + Send + Sync + 'static,
	{
		let timer = ResumableTimer::new(
			delay,
			false,
			DispatchQueue::Background,
			Arc::clone(&self.context.dispatcher),
			action,
		);
		if let Err(e) = timer.schedule_now() {
			warn!("Failed to schedule queue timer: {}", e);
		}
		timer
	}

	fn penalty_elapsed(self: &Arc<Self>) {
		lock(&self.state).penalty = None;
		debug!("Penalty for placement {} elapsed", self.placement);
		self.fill();
	}

	/// Remove one queued ad. Both expiration paths end here; whichever
	/// arrives second finds nothing.
	fn expire_entry(self: &Arc<Self>, entry_id: u64) {
		let (removed, ads_ready) = {
			let mut state = lock(&self.state);
			let index = state.ads.iter().position(|queued| queued.entry_id == entry_id);
			let removed = index.and_then(|index| state.ads.remove(index));
			(removed, state.ads.len())
		};

		let Some(entry) = removed else {
			debug!(
				"Queued ad entry {} for placement {} already removed",
				entry_id, self.placement
			);
			return;
		};

		entry.expiration.invalidate();
		entry.ad.partner_ad.invalidate();
		info!(
			"Queued ad {} for placement {} expired",
			entry.ad.load_id(),
			self.placement
		);
		self.notify(|delegate| delegate.did_remove_expired_ad(&self.placement, ads_ready));
		self.fill();
	}

	fn expire_load(self: &Arc<Self>, load_id: &str) {
		let entry_id = lock(&self.state)
			.ads
			.iter()
			.find(|queued| queued.ad.load_id() == load_id)
			.map(|queued| queued.entry_id);

		match entry_id {
			Some(entry_id) => self.expire_entry(entry_id),
			None => debug!(
				"Expired ad {} is not queued for placement {}",
				load_id, self.placement
			),
		}
	}

	/// Drop the oldest ads above the effective capacity, then refill
	fn apply_capacity(self: &Arc<Self>) {
		let (evicted, capacity) = {
			let mut state = lock(&self.state);
			let capacity = self.capacity(&state);
			let excess = state.ads.len().saturating_sub(capacity);
			let evicted: Vec<QueuedAd> = state.ads.drain(..excess).collect();
			(evicted, capacity)
		};

		for entry in &evicted {
			entry.expiration.invalidate();
			entry.ad.partner_ad.invalidate();
			info!(
				"Evicted ad {} from placement {} above capacity {}",
				entry.ad.load_id(),
				self.placement,
				capacity
			);
		}
		self.fill();
	}

	fn take_next(self: &Arc<Self>) -> Option<LoadedAd> {
		let entry = lock(&self.state).ads.pop_front()?;
		entry.expiration.invalidate();
		info!(
			"Dequeued ad {} from placement {}",
			entry.ad.load_id(),
			self.placement
		);
		self.on_background(QueueInner::fill);
		Some(entry.ad)
	}
}

/// Routes partner expiration callbacks back to the owning queue
struct ExpirationObserver {
	queue: Weak<QueueInner>,
}

impl PartnerAdDelegate for ExpirationObserver {
	fn did_expire(&self, load_id: &str, partner_id: &str) {
		let Some(queue) = self.queue.upgrade() else {
			return;
		};
		debug!("Partner {} reported ad {} expired", partner_id, load_id);
		let load_id = load_id.to_string();
		queue.on_background(move |queue| queue.expire_load(&load_id));
	}
}

/// Handle to the ad queue of one placement.
///
/// Clones refer to the same queue. Reads are answered from the queue's
/// state directly; transitions run on the dispatcher's background queue.
#[derive(Clone)]
pub struct AdQueue {
	inner: Arc<QueueInner>,
}

impl AdQueue {
	pub fn new(placement: impl Into<String>, format: AdFormat, context: QueueContext) -> Self {
		let requested_capacity = context.default_capacity;
		Self {
			inner: Arc::new(QueueInner {
				placement: placement.into(),
				format,
				context,
				delegate: Mutex::new(None),
				state: Mutex::new(QueueState {
					running: false,
					start_pending: false,
					queue_id: None,
					requested_capacity,
					ads: VecDeque::new(),
					load_in_flight: false,
					penalty: None,
					next_entry_id: 0,
				}),
			}),
		}
	}

	pub fn placement(&self) -> &str {
		&self.inner.placement
	}

	pub fn format(&self) -> AdFormat {
		self.inner.format
	}

	/// Start filling; deferred until initialization has completed
	pub fn start(&self) {
		self.inner.on_background(QueueInner::start);
	}

	/// Stop filling. In-flight loads still land and queued ads keep aging.
	pub fn stop(&self) {
		self.inner.on_background(QueueInner::stop);
	}

	/// Ask for a capacity; values outside `[1, max_queue_size]` are clamped.
	/// Ads above a lowered capacity are evicted oldest first.
	pub fn set_queue_capacity(&self, capacity: usize) {
		let effective = {
			let mut state = lock(&self.inner.state);
			state.requested_capacity = capacity;
			self.inner.capacity(&state)
		};
		if effective != capacity {
			debug!(
				"Queue capacity {} for placement {} clamped to {}",
				capacity, self.inner.placement, effective
			);
		}
		self.inner.on_background(QueueInner::apply_capacity);
	}

	pub fn queue_capacity(&self) -> usize {
		self.inner.capacity(&lock(&self.inner.state))
	}

	pub fn number_of_ads_ready(&self) -> usize {
		lock(&self.inner.state).ads.len()
	}

	pub fn has_next_ad(&self) -> bool {
		!lock(&self.inner.state).ads.is_empty()
	}

	pub fn is_running(&self) -> bool {
		lock(&self.inner.state).running
	}

	pub fn is_loading(&self) -> bool {
		lock(&self.inner.state).load_in_flight
	}

	/// Identifier of the current running period, or the last one once stopped
	pub fn queue_id(&self) -> Option<String> {
		lock(&self.inner.state).queue_id.clone()
	}

	/// Take the oldest queued ad. A running queue refills the freed slot.
	pub fn next_ad(&self) -> Option<LoadedAd> {
		self.inner.take_next()
	}

	pub fn set_delegate(&self, delegate: Option<Arc<dyn AdQueueDelegate>>) {
		*lock(&self.inner.delegate) = delegate;
	}

	/// Whether both handles refer to the same queue
	pub fn ptr_eq(&self, other: &AdQueue) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Re-clamp held ads and filling after the shared ceiling changed
	pub(crate) fn limits_changed(&self) {
		self.inner.on_background(QueueInner::apply_capacity);
	}
}

impl fmt::Debug for AdQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = lock(&self.inner.state);
		f.debug_struct("AdQueue")
			.field("placement", &self.inner.placement)
			.field("format", &self.inner.format)
			.field("running", &state.running)
			.field("queue_id", &state.queue_id)
			.field("capacity", &self.inner.capacity(&state))
			.field("ads_ready", &state.ads.len())
			.finish()
	}
}
