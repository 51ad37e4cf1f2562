//! Stdio framing between the extension and the host binary.
//!
//! Chrome's native messaging framing: a 4-byte little-endian length
//! header followed by a UTF-8 JSON payload, in both directions. Events
//! arrive on stdin, commands leave on stdout.

use crate::bridge::HostEvent;
use common::{HttpHeader, RequestId, TabId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Chrome caps native messages at 1 MiB.
pub const MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Commands emitted to the hosting extension.
///
/// Wire form is tagged JSON, e.g.
/// `{"command":"set-badge-text","tabId":7,"text":"1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum HostCommand {
    /// Set (or clear, with empty text) a tab's badge text.
    #[serde(rename_all = "camelCase")]
    SetBadgeText {
        /// Target tab.
        tab_id: TabId,
        /// Decimal count, or empty to clear.
        text: String,
    },

    /// Arm a request observer scoped to one tab.
    #[serde(rename_all = "camelCase")]
    AddRequestListener {
        /// Target tab.
        tab_id: TabId,
        /// Supported-source URL match patterns.
        urls: Vec<String>,
    },

    /// Register the outgoing-header listener.
    #[serde(rename_all = "camelCase")]
    AddHeaderListener {
        /// Supported-source URL match patterns.
        urls: Vec<String>,
    },

    /// Remove the outgoing-header listener.
    RemoveHeaderListener,

    /// Replace an in-flight request's outgoing headers.
    #[serde(rename_all = "camelCase")]
    ReplaceRequestHeaders {
        /// Host request identifier.
        request_id: RequestId,
        /// Sanitized replacement header list.
        headers: Vec<HttpHeader>,
    },
}

/// Error types for the stdio protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed frame (bad length, oversized, not UTF-8 JSON).
    #[error("Protocol error: {0}")]
    Frame(String),

    /// Underlying stdin/stdout failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload did not decode to a known event or command.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Create a frame error.
    pub fn frame<S: Into<String>>(message: S) -> Self {
        Self::Frame(message.into())
    }

    /// Whether this error means the peer closed the channel.
    pub fn is_closed_channel(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

/// Read one length-prefixed event frame.
///
/// # Errors
///
/// Returns a frame error for zero-length or oversized frames, a JSON
/// error for undecodable payloads, and an I/O error (with
/// `UnexpectedEof`) once the peer closes the channel.
pub async fn read_event<R>(reader: &mut R) -> Result<HostEvent, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut length_bytes = [0u8; 4];
    reader.read_exact(&mut length_bytes).await?;
    let length = u32::from_le_bytes(length_bytes) as usize;

    if length == 0 {
        return Err(ProtocolError::frame("Message length cannot be zero"));
    }
    if length > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::frame(format!(
            "Message length {length} exceeds maximum size {MAX_MESSAGE_SIZE}"
        )));
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    decode_event(&payload)
}

/// Write one length-prefixed command frame and flush.
///
/// # Errors
///
/// Returns an error when serialization or the write fails.
pub async fn write_command<W>(writer: &mut W, command: &HostCommand) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let payload = encode_command(command)?;
    writer
        .write_all(&(payload.len() as u32).to_le_bytes())
        .await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Decode an event payload (the bytes after the length header).
///
/// # Errors
///
/// Returns a frame error for invalid UTF-8 and a JSON error for
/// payloads that do not match any known event.
pub fn decode_event(payload: &[u8]) -> Result<HostEvent, ProtocolError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| ProtocolError::frame(format!("Invalid UTF-8 in message: {e}")))?;
    Ok(serde_json::from_str(text)?)
}

/// Encode a command payload (without the length header).
///
/// # Errors
///
/// Returns a frame error when the encoded command exceeds the message
/// size cap.
pub fn encode_command(command: &HostCommand) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(command)?;
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::frame(format!(
            "Command length {} exceeds maximum size {MAX_MESSAGE_SIZE}",
            payload.len()
        )));
    }
    Ok(payload)
}
