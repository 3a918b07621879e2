//! Signaling-service seam for `PeerChat`.
//!
//! Everything the client learns about the network arrives through this
//! module as a [`SessionEvent`]: the registration outcome, connection
//! lifecycle, and per-connection payloads. A single dispatch function in
//! the session layer consumes the stream, which keeps the state machine
//! testable without a live transport. Concrete implementations:
//! - [`in_process::InProcessHub`] — in-memory hub for tests and demos
//! - [`ws::WsSignaling`] — WebSocket client for an external broker

pub mod in_process;
pub mod ws;

use tokio::sync::mpsc;

use peerchat_proto::message::{Message, PeerId};

/// Errors surfaced by signaling-service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The local identity was never registered, or registration failed.
    #[error("identity {0} is not registered with the signaling service")]
    NotRegistered(PeerId),

    /// The connection to the signaling service has been closed.
    #[error("signaling service connection closed")]
    ServiceClosed,

    /// The operation timed out before completing.
    #[error("signaling operation timed out")]
    Timeout,

    /// The signaling URL could not be parsed.
    #[error("invalid signaling URL: {0}")]
    InvalidUrl(String),

    /// An underlying I/O error occurred.
    #[error("signaling I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to one open duplex channel leading to a remote identity.
///
/// Minted by a signaling-service implementation and handed to the session
/// layer inside [`ConnEvent::Opened`]. Dropping the handle closes the
/// channel; the remote side observes a [`ConnEvent::Closed`].
#[derive(Debug)]
pub struct Connection {
    /// Identity of the remote end.
    remote: PeerId,
    /// Outbound payload queue, drained by the service's forwarding machinery.
    tx: mpsc::Sender<Message>,
}

impl Connection {
    /// Create a handle from its parts.
    ///
    /// Service implementations wire the receiving half of `tx` to their
    /// outbound machinery before handing the handle out.
    #[must_use]
    pub const fn new(remote: PeerId, tx: mpsc::Sender<Message>) -> Self {
        Self { remote, tx }
    }

    /// The remote identity this channel leads to.
    #[must_use]
    pub const fn remote(&self) -> &PeerId {
        &self.remote
    }

    /// Queue a payload for delivery.
    ///
    /// Best-effort: a full or closed channel is logged and the payload
    /// dropped. Delivery carries no acknowledgment.
    pub fn send(&self, message: &Message) {
        if let Err(e) = self.tx.try_send(message.clone()) {
            tracing::warn!(peer = %self.remote, error = %e, "dropping outbound payload");
        }
    }

    /// Whether the underlying channel is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Lifecycle of a single connection, as seen by the session layer.
#[derive(Debug)]
pub enum ConnEvent {
    /// The channel reached the open state.
    ///
    /// Carries the minted handle, so outbound dials and inbound
    /// connections share one success path.
    Opened(Connection),
    /// A payload arrived on the channel.
    ///
    /// The session layer attributes it to the connection's identity; the
    /// payload's declared sender has no effect.
    DataReceived(Message),
    /// The channel was closed by either side.
    Closed,
    /// The channel failed.
    Errored(String),
}

/// Top-level event stream consumed by the session dispatch function.
#[derive(Debug)]
pub enum SessionEvent {
    /// The signaling service acknowledged the identity registration.
    Registered {
        /// The identity that was registered.
        identity: PeerId,
    },
    /// Registration failed, or an established registration was lost.
    RegistrationError {
        /// Human-readable failure description.
        reason: String,
    },
    /// A connection-scoped event.
    Conn {
        /// The remote identity the event concerns.
        peer: PeerId,
        /// What happened on that connection.
        event: ConnEvent,
    },
}

/// Client-side seam to the external signaling/transport service.
///
/// Implementations register an identity at construction time and report
/// the outcome through the event stream — there is no blocking register
/// call, which is what makes the `Connecting` session state observable.
pub trait SignalingService: Send + Sync {
    /// Initiate an outbound dial to a remote identity.
    ///
    /// Returns once the dial request has been handed to the service.
    /// Completion arrives later as a [`ConnEvent::Opened`] (or
    /// [`ConnEvent::Errored`]) session event; an unreachable peer is
    /// reported the same way, never as an `Err` here.
    fn open(
        &self,
        remote: &PeerId,
    ) -> impl std::future::Future<Output = Result<(), ServiceError>> + Send;

    /// Yield the next session event, or `None` once the service is gone.
    fn next_event(&self) -> impl std::future::Future<Output = Option<SessionEvent>> + Send;

    /// The identity this service registered (or attempted to register).
    fn local_identity(&self) -> &PeerId;
}
