//! Mediation Adapters
//!
//! HTTP transport for auctions, queue event delivery and the registry of
//! partner network adapters.

pub mod auction_client;
pub mod event_client;
pub mod http_client;
pub mod registry;

pub use auction_client::HttpAuctionTransport;
pub use event_client::HttpQueueEventClient;
pub use registry::PartnerRegistry;
pub use mediation_types::{AdapterError, AdapterResult, PartnerAdapter};
