//! Broker wire protocol for the `PeerChat` signaling service.
//!
//! Defines the [`SignalMessage`] enum that is postcard-encoded and sent
//! over WebSocket binary frames between clients and the signaling broker.
//! This crate ships only the client side; the broker itself is an external
//! service.

use serde::{Deserialize, Serialize};

/// Messages exchanged between clients and the signaling broker.
///
/// The protocol is simple: a client registers an identity, then dials
/// other identities and exchanges opaque payload bytes routed by identity.
/// The broker overwrites every `from` field with the sender's registered
/// identity, so clients never see a peer-declared origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalMessage {
    /// Client claims an identity with the broker.
    ///
    /// Must be the first frame after the WebSocket connection opens.
    /// The broker answers with [`SignalMessage::Registered`] on success or
    /// [`SignalMessage::Error`] if the identity is already in use.
    Register {
        /// The identity being claimed.
        identity: String,
    },

    /// Broker acknowledges a successful registration.
    Registered {
        /// The identity that was registered (echoed back).
        identity: String,
    },

    /// Dial request, forwarded by the broker to `to`.
    Connect {
        /// The dialing peer (overwritten by the broker).
        from: String,
        /// The peer being dialed.
        to: String,
    },

    /// Dial acceptance, forwarded back to the dialing peer.
    ///
    /// Once each side has seen the other's `Connect`/`ConnectAck`, the
    /// channel between the two identities is open.
    ConnectAck {
        /// The accepting peer (overwritten by the broker).
        from: String,
        /// The peer that initiated the dial.
        to: String,
    },

    /// An application payload routed between two connected peers.
    Payload {
        /// Sender's identity (overwritten by the broker).
        from: String,
        /// Recipient's identity (used by the broker for routing).
        to: String,
        /// Opaque payload bytes (a postcard-encoded chat message).
        payload: Vec<u8>,
    },

    /// Either side is closing the channel between `from` and `to`.
    Close {
        /// The closing peer (overwritten by the broker).
        from: String,
        /// The peer being notified.
        to: String,
    },

    /// Broker-reported failure (identity taken, peer unreachable, ...).
    Error {
        /// Human-readable error description.
        reason: String,
    },
}

/// Encodes a [`SignalMessage`] into bytes using postcard.
pub fn encode(msg: &SignalMessage) -> Result<Vec<u8>, String> {
    postcard::to_allocvec(msg).map_err(|e| format!("signal encode error: {e}"))
}

/// Decodes a [`SignalMessage`] from bytes using postcard.
pub fn decode(bytes: &[u8]) -> Result<SignalMessage, String> {
    postcard::from_bytes(bytes).map_err(|e| format!("signal decode error: {e}"))
}
