//! Event — the message type carried over the chat websocket.
//!
//! ARCHITECTURE
//! ============
//! Every websocket frame is a JSON object `{"type": ..., "data": {...}}`.
//! Clients send `ClientEvent`s (OPEN / MESSAGE / READ); the server answers
//! and fans out `ServerEvent`s. Both are closed enums, so a malformed frame
//! is rejected at the boundary and never reaches the chat services.
//!
//! DESIGN
//! ======
//! - Room and message ids accept either JSON numbers or numeric strings,
//!   and the legacy field names `chat_id` / `id` are accepted as aliases.
//! - Failures travel as `ERROR` events built from any `ErrorCode` error.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::store::Message;

/// Error code for frames that fail to parse.
pub const E_INVALID_EVENT: &str = "E_INVALID_EVENT";

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error events.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// INBOUND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "UPPERCASE")]
pub enum ClientEvent {
    /// Subscribe this connection to a room.
    Open(OpenData),
    /// Persist a message, then fan it out.
    Message(MessageData),
    /// Mark a message read, then fan out a receipt.
    Read(ReadData),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenData {
    #[serde(alias = "chat_id", deserialize_with = "flexible_id")]
    pub room_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageData {
    #[serde(alias = "chat_id", deserialize_with = "flexible_id")]
    pub room_id: i64,
    pub text: String,
    /// Optional; must match the authenticated user when present.
    #[serde(default)]
    pub sender_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadData {
    #[serde(alias = "id", deserialize_with = "flexible_id")]
    pub message_id: i64,
    #[serde(alias = "chat_id", deserialize_with = "flexible_id")]
    pub room_id: i64,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl ClientEvent {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open(_) => "OPEN",
            Self::Message(_) => "MESSAGE",
            Self::Read(_) => "READ",
        }
    }

    #[must_use]
    pub fn room_id(&self) -> i64 {
        match self {
            Self::Open(d) => d.room_id,
            Self::Message(d) => d.room_id,
            Self::Read(d) => d.room_id,
        }
    }
}

/// A numeric id sent either as a JSON number or a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleId {
    Int(i64),
    Str(String),
}

impl FlexibleId {
    fn into_id<E: serde::de::Error>(self) -> Result<Option<i64>, E> {
        match self {
            Self::Int(v) => Ok(Some(v)),
            Self::Str(s) if s.trim().is_empty() => Ok(None),
            Self::Str(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::custom(format!("invalid id: {s:?}"))),
        }
    }
}

fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    FlexibleId::deserialize(deserializer)?
        .into_id()?
        .ok_or_else(|| serde::de::Error::custom("id must not be empty"))
}

/// Optional variant of `flexible_id` for request bodies: `null`, a missing
/// field, and an empty string all read as `None`. Pair with `#[serde(default)]`.
pub(crate) fn flexible_id_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<FlexibleId>::deserialize(deserializer)? {
        Some(raw) => raw.into_id(),
        None => Ok(None),
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "UPPERCASE")]
pub enum ServerEvent {
    /// First frame on every connection.
    Connected { connection_id: Uuid, user_id: Uuid },
    /// Reply to a successful OPEN.
    Opened { room_id: i64 },
    /// A persisted message, fanned out to the room.
    Message(Message),
    /// A read receipt, fanned out to the room.
    Read(ReadReceipt),
    /// A failed event. Sent to the originating connection only.
    Error(ErrorData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: i64,
    pub room_id: i64,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ServerEvent {
    /// Plain error event with an explicit code.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error(ErrorData { code: code.to_owned(), message: message.into(), retryable: false })
    }

    /// Structured error event from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error(ErrorData {
            code: err.error_code().to_owned(),
            message: err.to_string(),
            retryable: err.retryable(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "CONNECTED",
            Self::Opened { .. } => "OPENED",
            Self::Message(_) => "MESSAGE",
            Self::Read(_) => "READ",
            Self::Error(_) => "ERROR",
        }
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
