//! Session state machine.
//!
//! [`SessionManager`] owns the local identity's registration state, the
//! map of remote identities to open connections, and the append-only
//! message history. It is a pure state machine — no I/O — mutated only
//! through [`handle_event`](SessionManager::handle_event) and the narrow
//! command surface (send text, send file), and read through
//! [`snapshot`](SessionManager::snapshot). The driving task in
//! [`crate::net`] serializes all access, so no locking is required.

use std::collections::HashMap;

use peerchat_proto::data_uri;
use peerchat_proto::message::{Message, MessageKind, PeerId};

use crate::signaling::{ConnEvent, Connection, SessionEvent};

/// Local registration state with the signaling service.
///
/// Reflects only the local identity's registration — never per-peer
/// connection health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not registered. A fresh attempt requires a new session.
    Disconnected,
    /// Registration request sent, verdict pending.
    Connecting,
    /// Registered with the signaling service (not "has peers").
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Append-only ordered log of chat messages.
///
/// Receipt order across peers — no global clock, no reordering. Scoped to
/// the session lifetime; in-memory only.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    /// Create an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append one message. Entries are never removed or reordered.
    pub fn append(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only view of the session handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// The local identity.
    pub local: PeerId,
    /// Current registration state.
    pub state: SessionState,
    /// Connected peers, in the order their connections opened.
    pub peers: Vec<PeerId>,
    /// The full message history, oldest first.
    pub history: Vec<Message>,
}

/// Owns the session: registration lifecycle, at most one connection per
/// remote identity, and the message history.
pub struct SessionManager {
    /// The local identity (also the sender stamped on every echo).
    local: PeerId,
    /// Registration state with the signaling service.
    state: SessionState,
    /// Open connections, keyed by remote identity.
    connections: HashMap<PeerId, Connection>,
    /// Connected-peer list, in connection-open order.
    peers: Vec<PeerId>,
    /// Append-only message history.
    history: MessageLog,
}

impl SessionManager {
    /// Start a session for `local` with registration in flight.
    ///
    /// The state begins at [`SessionState::Connecting`]; the registration
    /// verdict arrives as a [`SessionEvent`]. There is exactly one attempt
    /// per session — on failure the state rests at `Disconnected` until a
    /// new session is created.
    #[must_use]
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            state: SessionState::Connecting,
            connections: HashMap::new(),
            peers: Vec::new(),
            history: MessageLog::new(),
        }
    }

    /// The local identity.
    #[must_use]
    pub const fn local_identity(&self) -> &PeerId {
        &self.local
    }

    /// Current registration state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Connected peers, in connection-open order.
    #[must_use]
    pub fn connected_peers(&self) -> &[PeerId] {
        &self.peers
    }

    /// The message history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        self.history.entries()
    }

    /// Whether a dial for `remote` should be issued.
    ///
    /// False while not registered, while a connection for `remote` is
    /// already open (dialing is idempotent), or for the local identity
    /// itself.
    #[must_use]
    pub fn wants_dial(&self, remote: &PeerId) -> bool {
        self.state == SessionState::Connected
            && *remote != self.local
            && !self.connections.contains_key(remote)
    }

    /// Apply one service event.
    ///
    /// The only mutation entry point besides the send commands; every
    /// transition in the session lifecycle passes through here.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Registered { identity } => {
                tracing::info!(identity = %identity, "session registered");
                self.state = SessionState::Connected;
            }
            SessionEvent::RegistrationError { reason } => {
                tracing::warn!(reason = %reason, "session registration lost");
                self.state = SessionState::Disconnected;
            }
            SessionEvent::Conn { peer, event } => self.handle_conn_event(peer, event),
        }
    }

    /// Single dispatch point for per-connection events.
    ///
    /// Outbound dials and inbound connections both arrive as `Opened` and
    /// share this path.
    fn handle_conn_event(&mut self, peer: PeerId, event: ConnEvent) {
        match event {
            ConnEvent::Opened(conn) => {
                if self.connections.contains_key(&peer) {
                    // Simultaneous dials can race a second channel into
                    // existence; discarding the handle closes it.
                    tracing::debug!(peer = %peer, "duplicate connection discarded");
                    return;
                }
                tracing::info!(peer = %peer, "connection opened");
                self.connections.insert(peer.clone(), conn);
                self.peers.push(peer);
            }
            ConnEvent::DataReceived(payload) => {
                // Attribution comes from the connection the payload arrived
                // on; the payload's declared sender has no effect.
                let message = Message {
                    sender: peer,
                    ..payload
                };
                self.history.append(message);
            }
            ConnEvent::Closed => {
                tracing::info!(peer = %peer, "connection closed");
                self.remove_peer(&peer);
            }
            ConnEvent::Errored(reason) => {
                tracing::warn!(peer = %peer, reason = %reason, "connection failed");
                self.remove_peer(&peer);
            }
        }
    }

    /// Drop the connection and peer-list entry for `peer`, if present.
    ///
    /// Nothing is synthesized into history for a disconnect.
    fn remove_peer(&mut self, peer: &PeerId) {
        self.connections.remove(peer);
        self.peers.retain(|p| p != peer);
    }

    /// Broadcast a message to every open connection.
    ///
    /// The local echo lands in history first, before any network activity;
    /// delivery is best-effort with no acknowledgment, no retry, and no
    /// ordering guarantee across peers.
    pub fn send_message(
        &mut self,
        content: impl Into<String>,
        kind: MessageKind,
        file_name: Option<String>,
    ) {
        let message = Message {
            kind,
            sender: self.local.clone(),
            content: content.into(),
            file_name,
        };
        self.history.append(message.clone());
        for conn in self.connections.values() {
            conn.send(&message);
        }
    }

    /// Broadcast a plain text message.
    pub fn send_text(&mut self, content: impl Into<String>) {
        self.send_message(content, MessageKind::Text, None);
    }

    /// Encode file bytes as a data-URI and broadcast a file message.
    ///
    /// Whole-buffer encoding: the entire file is held in memory for the
    /// encode step. No size cap, no chunking, no backpressure.
    pub fn send_file(&mut self, file_name: impl Into<String>, bytes: &[u8]) {
        let content = data_uri::encode(bytes);
        self.send_message(content, MessageKind::File, Some(file_name.into()));
    }

    /// Clone a read-only view for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            local: self.local.clone(),
            state: self.state,
            peers: self.peers.clone(),
            history: self.history.entries().to_vec(),
        }
    }
}
