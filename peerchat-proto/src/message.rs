//! Chat payload types for the `PeerChat` protocol.
//!
//! A [`Message`] is both the on-the-wire payload exchanged between peers
//! and the record appended to local history. It is serialized with
//! postcard before transmission.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity token naming a participant.
///
/// Used both as the local self-address and as the lookup key when dialing
/// a remote peer through the signaling service. Generated once per process
/// unless supplied via configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer identity from a string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identity token (UUID v7, simple form).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Return the string representation of this identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Distinguishes plain text from file attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Plain text content.
    Text,
    /// File attachment; `content` holds a data-URI of the file bytes.
    File,
}

/// One chat event: the wire payload and the history record share this shape.
///
/// For [`MessageKind::File`], `content` is a base64 data-URI
/// (`data:<mime>;base64,…`) and `file_name` is present. The `sender` field
/// is advisory on the wire — receivers replace it with the identity of the
/// connection the payload arrived on, so a peer cannot speak for another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Whether this is text or a file attachment.
    pub kind: MessageKind,
    /// Who sent this message (attested by the connection on receipt).
    pub sender: PeerId,
    /// Text content, or a data-URI for file messages.
    pub content: String,
    /// Original file name, present for file messages.
    pub file_name: Option<String>,
}

impl Message {
    /// Build a plain text message.
    #[must_use]
    pub fn text(sender: PeerId, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            sender,
            content: content.into(),
            file_name: None,
        }
    }

    /// Build a file message from an already data-URI-encoded content string.
    #[must_use]
    pub fn file(sender: PeerId, content: String, file_name: String) -> Self {
        Self {
            kind: MessageKind::File,
            sender,
            content,
            file_name: Some(file_name),
        }
    }

    /// Whether this message carries a file attachment.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind, MessageKind::File)
    }
}
