//! Per-placement load cooldowns advised by the auction server

use std::time::{Duration, Instant};

use dashmap::DashMap;
use mediation_types::constants::limits::MAX_LOAD_RATE_LIMIT_SECS;
use tracing::{debug, warn};

/// Longest cooldown a placement can be put under
pub const MAX_LOAD_RATE_LIMIT: Duration = Duration::from_secs(MAX_LOAD_RATE_LIMIT_SECS);

/// Cooldown state of one placement
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterState {
	/// Earliest moment the next load may start
	pub next_allowed_at: Instant,
	/// Most recent limit advised by the server
	pub last_limit: Duration,
}

/// Tracks when each placement may load again.
///
/// Safe to share between threads; every placement is an independent entry.
#[derive(Debug)]
pub struct RateLimiter {
	default_limit: Duration,
	states: DashMap<String, RateLimiterState>,
}

impl RateLimiter {
	pub fn new(default_limit: Duration) -> Self {
		Self {
			default_limit,
			states: DashMap::new(),
		}
	}

	/// Remaining cooldown for a placement, `Duration::ZERO` when a load may proceed
	pub fn time_until_next_load_is_allowed(&self, placement: &str) -> Duration {
		self.states
			.get(placement)
			.map(|state| state.next_allowed_at.saturating_duration_since(Instant::now()))
			.unwrap_or(Duration::ZERO)
	}

	/// Record a server-advised limit; the cooldown starts now.
	///
	/// Limits above [`MAX_LOAD_RATE_LIMIT`] are capped.
	pub fn set_load_rate_limit(&self, limit: Duration, placement: &str) {
		let limit = if limit > MAX_LOAD_RATE_LIMIT {
			warn!(
				"Rate limit {:?} for placement {} capped at {:?}",
				limit, placement, MAX_LOAD_RATE_LIMIT
			);
			MAX_LOAD_RATE_LIMIT
		} else {
			limit
		};

		let Some(next_allowed_at) = Instant::now().checked_add(limit) else {
			warn!(
				"Ignoring out of range rate limit {:?} for placement {}",
				limit, placement
			);
			return;
		};

		debug!("Rate limit for placement {} set to {:?}", placement, limit);
		self.states.insert(
			placement.to_string(),
			RateLimiterState {
				next_allowed_at,
				last_limit: limit,
			},
		);
	}

	/// Last advised limit, or the configured default
	pub fn load_rate_limit(&self, placement: &str) -> Duration {
		self.states
			.get(placement)
			.map(|state| state.last_limit)
			.unwrap_or(self.default_limit)
	}

	pub fn state(&self, placement: &str) -> Option<RateLimiterState> {
		self.states.get(placement).map(|state| *state)
	}
}

impl Default for RateLimiter {
	fn default() -> Self {
		Self::new(Duration::ZERO)
	}
}
