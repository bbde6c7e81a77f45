//! Ad request and loaded ad models

pub mod loaded;
pub mod request;

pub use loaded::LoadedAd;
pub use request::{AdFormat, AdSize, LoadRequest};
