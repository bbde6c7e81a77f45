//! Mediation Service
//!
//! Auctions, the bid fulfillment waterfall, load rate limiting, timers and
//! the per-placement ad queues built on top of them.

pub mod auction;
pub mod dispatch;
pub mod fulfill;
pub mod init;
pub mod loader;
pub mod partner_info;
pub mod queue;
pub mod rate_limiter;
pub mod timer;

mod sync;

#[cfg(test)]
mod test_support;

pub use auction::{
	AdAuctionResponse, AuctionService, RequestContext, RequestContextProvider,
	StaticContextProvider,
};
pub use dispatch::{
	DispatchError, DispatchQueue, GroupOutcome, ImmediateDispatcher, Task, TaskDispatcher,
	TaskDispatcherExt, TaskGroup, TokioDispatcher,
};
pub use fulfill::{BidFulfillOperation, FulfillError, FulfilledBid, PartnerAdLoader, Waterfall};
pub use init::InitializationSignal;
pub use loader::{AdLoader, MediationAdLoader};
pub use partner_info::{AdapterPartnerInfoCollector, PartnerInfo, PartnerInfoCollector};
pub use queue::{AdQueue, AdQueueDelegate, QueueContext, QueueError, QueueLimits, QueueRegistry};
pub use rate_limiter::{RateLimiter, RateLimiterState, MAX_LOAD_RATE_LIMIT};
pub use timer::{ResumableTimer, TimerError, TimerState};
