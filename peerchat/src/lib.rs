//! `PeerChat` — peer-to-peer terminal chat library.

pub mod app;
pub mod config;
pub mod net;
pub mod prefs;
pub mod session;
pub mod signaling;
pub mod ui;
