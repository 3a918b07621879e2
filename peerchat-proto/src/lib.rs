//! Shared protocol definitions for the `PeerChat` wire format.

pub mod codec;
pub mod data_uri;
pub mod message;
pub mod signal;
