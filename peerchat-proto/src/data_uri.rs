//! Data-URI encoding for file payloads.
//!
//! File attachments travel as `data:<mime>;base64,<bytes>` strings, the
//! shape a browser `FileReader.readAsDataURL` produces. Encoding is
//! whole-buffer: the entire file must fit in memory before the message is
//! built.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Mime type stamped on outbound attachments.
const OCTET_STREAM: &str = "application/octet-stream";

/// Errors produced when parsing a data-URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    /// The string does not start with `data:` or lacks a `,` separator.
    #[error("not a data URI")]
    MissingScheme,
    /// The URI does not declare base64 encoding.
    #[error("data URI is not base64-encoded")]
    NotBase64,
    /// The base64 payload failed to decode.
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// Encodes raw file bytes as a base64 data-URI.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    format!("data:{OCTET_STREAM};base64,{}", BASE64.encode(bytes))
}

/// Decodes a base64 data-URI back into its mime type and raw bytes.
///
/// Accepts any mime type; an empty mime defaults to `text/plain`, matching
/// the data-URI RFC.
///
/// # Errors
///
/// Returns [`DataUriError`] if the scheme or separator is missing, the URI
/// is not base64-encoded, or the payload is not valid base64.
pub fn decode(uri: &str) -> Result<(String, Vec<u8>), DataUriError> {
    let rest = uri.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingScheme)?;
    let mime = header.strip_suffix(";base64").ok_or(DataUriError::NotBase64)?;
    let mime = if mime.is_empty() {
        "text/plain".to_string()
    } else {
        mime.to_string()
    };
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| DataUriError::InvalidPayload(e.to_string()))?;
    Ok((mime, bytes))
}
