//! Global limits and defaults for configuration and runtime

/// Default load rate limit echoed to the server before it has advised one
pub const DEFAULT_LOAD_RATE_LIMIT_SECS: u64 = 0;

/// Longest load cooldown honored from the server's rate limit header, in seconds
pub const MAX_LOAD_RATE_LIMIT_SECS: u64 = 86_400; // 24h

/// Default timeout for a single auction HTTP request in milliseconds
pub const DEFAULT_AUCTION_TIMEOUT_MS: u64 = 5_000; // 5s

/// Default overall load timeout (auction + waterfall) in milliseconds
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 15_000; // 15s

/// Default time budget for collecting partner bidder tokens in milliseconds
pub const DEFAULT_PARTNER_TOKEN_TIMEOUT_MS: u64 = 1_000; // 1s

/// Server-controlled ceiling for queue capacity until told otherwise
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 5;

/// Capacity a new queue starts with
pub const DEFAULT_QUEUE_CAPACITY: usize = 3;

/// Lower bound for any queue capacity
pub const MIN_QUEUE_CAPACITY: usize = 1;

/// Default time-to-live of a queued ad in seconds
pub const DEFAULT_QUEUED_AD_TTL_SECS: u64 = 3_600; // 1h

/// Fixed delay before a queue retries after a failed load, in seconds
pub const DEFAULT_QUEUE_PENALTY_DELAY_SECS: u64 = 60;

/// Upper bound for the configured queued ad TTL and penalty delay, in seconds
pub const MAX_QUEUE_TIMER_SECS: u64 = 604_800; // 7d
