//! Protocol header names and global limits

pub mod headers;
pub mod limits;
