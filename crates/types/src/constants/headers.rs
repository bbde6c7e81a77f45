//! HTTP header names exchanged with the auction endpoint

/// Ad format of the load, sent with every bid request
pub const AD_TYPE: &str = "x-mediation-ad-type";

/// Unique identifier of the load attempt
pub const LOAD_ID: &str = "x-mediation-load-id";

/// Queue identifier, only present when the load was issued by an ad queue
pub const QUEUE_ID: &str = "x-mediation-queue-id";

/// Rate limit reset window in seconds.
///
/// Sent with the current value on requests, returned by the server with the next value.
pub const RATE_LIMIT_RESET: &str = "x-mediation-ratelimit-reset";

/// Auction identifier returned by the server
pub const AUCTION_ID: &str = "x-mediation-auction-id";

/// Version of this SDK core
pub const SDK_VERSION: &str = "x-mediation-sdk-version";
