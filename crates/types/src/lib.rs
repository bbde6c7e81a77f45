//! Mediation Types
//!
//! Shared models, wire shapes, errors and partner traits for the ad mediation core.

pub mod adapters;
pub mod ads;
pub mod bids;
pub mod constants;
pub mod errors;
pub mod events;
pub mod transport;

// Re-export serde_json for convenience
pub use serde_json;

pub use adapters::{
	AdapterError, AdapterResult, PartnerAd, PartnerAdDelegate, PartnerAdLoadRequest,
	PartnerAdapter, PartnerIdentity, PreBidRequest,
};
pub use ads::{AdFormat, AdSize, LoadRequest, LoadedAd};
pub use bids::{Bid, BidRequest, BidResponse, RewardedCallback};
pub use errors::{BidFailure, MediationError, MediationResult};
pub use events::{NoopQueueEventSink, QueueEvent, QueueEventSink};
pub use transport::{AuctionHttpRequest, AuctionHttpResponse, AuctionTransport, TransportError};
