//! JSON encode/decode for Taskboard wire types.
//!
//! The REST routes and the notification socket both carry JSON; these
//! helpers give every caller the same error type.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::notification::ServerMessage;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A text frame was expected but the payload was not UTF-8.
    #[error("frame is not valid UTF-8")]
    NotUtf8,
}

/// Encodes any wire value as a JSON string.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes any wire value from a JSON string.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the text is not valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Decodes a notification frame that arrived as raw bytes.
///
/// Some servers send JSON in binary WebSocket frames, so both frame kinds
/// funnel through here.
///
/// # Errors
///
/// Returns [`CodecError::NotUtf8`] for non-UTF-8 payloads and
/// [`CodecError::Serialization`] for malformed JSON.
pub fn decode_server_message(bytes: &[u8]) -> Result<ServerMessage, CodecError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CodecError::NotUtf8)?;
    decode(text)
}
