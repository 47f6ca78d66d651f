//! Storage seam — the `ChatStore` trait and its row types.
//!
//! DESIGN
//! ======
//! Every read and write the chat services perform goes through `ChatStore`.
//! Production wires `PgChatStore` (Postgres via sqlx); tests wire the
//! in-memory store from `state::test_helpers`. Both are wrapped in
//! `TimedStore` so a hung query surfaces as `StoreError::Timeout` for that
//! one call instead of stalling the connection forever.
//!
//! Message ids come from a database sequence and are the only ordering key
//! for pagination. Store methods that return several messages document
//! their order; callers never re-sort.

pub mod postgres;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub use postgres::PgChatStore;

// =============================================================================
// ROWS
// =============================================================================

/// Two-party conversation. One row per (author, guest) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatRoom {
    pub id: i64,
    pub author_id: Uuid,
    pub guest_id: Uuid,
    pub post_id: Option<i64>,
    pub guest_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ChatRoom {
    #[must_use]
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.author_id == user_id || self.guest_id == user_id
    }

    /// The participant who is not `user_id`. Assumes `user_id` is a participant.
    #[must_use]
    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if self.author_id == user_id { self.guest_id } else { self.author_id }
    }
}

/// Persisted chat message. Mirrors the `messages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: Uuid,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
    pub is_read: bool,
    pub is_blocked: bool,
}

/// Insert payload for a message. Id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: i64,
    pub sender_id: Uuid,
    pub text: String,
    pub is_blocked: bool,
}

/// Insert payload for a room.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub author_id: Uuid,
    pub guest_id: Uuid,
    pub post_id: Option<i64>,
    pub guest_image: Option<String>,
}

/// Which side of a room the caller is listing rooms for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomRole {
    Author,
    Guest,
}

impl RoomRole {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "AUTHOR" => Some(Self::Author),
            "GUEST" => Some(Self::Guest),
            _ => None,
        }
    }
}

/// Room listing entry with the latest message and the viewer's unread count.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    #[serde(flatten)]
    pub room: ChatRoom,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

/// Identity resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    // --- identity ---

    /// Resolve an unexpired session token.
    async fn session_user(&self, token: &str) -> Result<Option<SessionUser>, StoreError>;
    async fn create_user(&self, name: &str) -> Result<Uuid, StoreError>;
    async fn create_session(&self, token: &str, user_id: Uuid) -> Result<(), StoreError>;

    // --- rooms ---

    /// Insert a room unless one already exists for the (author, guest) pair.
    /// Returns the room and whether this call created it.
    async fn get_or_create_room(&self, room: NewRoom) -> Result<(ChatRoom, bool), StoreError>;
    async fn room(&self, room_id: i64) -> Result<Option<ChatRoom>, StoreError>;
    async fn rooms_for_user(&self, user_id: Uuid, role: RoomRole) -> Result<Vec<RoomSummary>, StoreError>;
    /// Returns false if the room did not exist.
    async fn delete_room(&self, room_id: i64) -> Result<bool, StoreError>;

    // --- blocks ---

    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError>;
    /// Returns false if the block already existed.
    async fn insert_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError>;
    /// Returns false if there was no such block.
    async fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError>;

    // --- messages ---

    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError>;
    async fn message(&self, message_id: i64) -> Result<Option<Message>, StoreError>;
    /// Set `is_read`, returning the updated row.
    async fn mark_read(&self, message_id: i64) -> Result<Option<Message>, StoreError>;
    /// Lowest id in the room sent by someone other than `viewer_id` and unread.
    async fn first_unread(&self, room_id: i64, viewer_id: Uuid) -> Result<Option<i64>, StoreError>;
    /// Up to `limit` messages with id > `cursor`, ascending.
    async fn messages_after(&self, room_id: i64, cursor: i64, limit: i64) -> Result<Vec<Message>, StoreError>;
    /// Up to `limit` messages with id < `cursor`, DESCENDING.
    async fn messages_before(&self, room_id: i64, cursor: i64, limit: i64) -> Result<Vec<Message>, StoreError>;
    /// The `limit` newest messages, DESCENDING.
    async fn latest_messages(&self, room_id: i64, limit: i64) -> Result<Vec<Message>, StoreError>;
    /// Every message with id >= `from_id`, ascending. Unbounded.
    async fn messages_from(&self, room_id: i64, from_id: i64) -> Result<Vec<Message>, StoreError>;
    /// Whether the user has any unread message from someone else in any room.
    async fn has_unread(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

// =============================================================================
// TIMEOUT DECORATOR
// =============================================================================

/// Wraps a store so every call is bounded by `limit`.
pub struct TimedStore<S> {
    inner: S,
    limit: Duration,
}

impl<S> TimedStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T, StoreError>> + Send) -> Result<T, StoreError> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(limit_ms = self.limit.as_millis(), "store call timed out");
                Err(StoreError::Timeout(self.limit))
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: ChatStore> ChatStore for TimedStore<S> {
    async fn session_user(&self, token: &str) -> Result<Option<SessionUser>, StoreError> {
        self.bounded(self.inner.session_user(token)).await
    }

    async fn create_user(&self, name: &str) -> Result<Uuid, StoreError> {
        self.bounded(self.inner.create_user(name)).await
    }

    async fn create_session(&self, token: &str, user_id: Uuid) -> Result<(), StoreError> {
        self.bounded(self.inner.create_session(token, user_id)).await
    }

    async fn get_or_create_room(&self, room: NewRoom) -> Result<(ChatRoom, bool), StoreError> {
        self.bounded(self.inner.get_or_create_room(room)).await
    }

    async fn room(&self, room_id: i64) -> Result<Option<ChatRoom>, StoreError> {
        self.bounded(self.inner.room(room_id)).await
    }

    async fn rooms_for_user(&self, user_id: Uuid, role: RoomRole) -> Result<Vec<RoomSummary>, StoreError> {
        self.bounded(self.inner.rooms_for_user(user_id, role)).await
    }

    async fn delete_room(&self, room_id: i64) -> Result<bool, StoreError> {
        self.bounded(self.inner.delete_room(room_id)).await
    }

    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError> {
        self.bounded(self.inner.is_blocked(blocker_id, blocked_id)).await
    }

    async fn insert_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError> {
        self.bounded(self.inner.insert_block(blocker_id, blocked_id)).await
    }

    async fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError> {
        self.bounded(self.inner.delete_block(blocker_id, blocked_id)).await
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.bounded(self.inner.insert_message(message)).await
    }

    async fn message(&self, message_id: i64) -> Result<Option<Message>, StoreError> {
        self.bounded(self.inner.message(message_id)).await
    }

    async fn mark_read(&self, message_id: i64) -> Result<Option<Message>, StoreError> {
        self.bounded(self.inner.mark_read(message_id)).await
    }

    async fn first_unread(&self, room_id: i64, viewer_id: Uuid) -> Result<Option<i64>, StoreError> {
        self.bounded(self.inner.first_unread(room_id, viewer_id)).await
    }

    async fn messages_after(&self, room_id: i64, cursor: i64, limit: i64) -> Result<Vec<Message>, StoreError> {
        self.bounded(self.inner.messages_after(room_id, cursor, limit)).await
    }

    async fn messages_before(&self, room_id: i64, cursor: i64, limit: i64) -> Result<Vec<Message>, StoreError> {
        self.bounded(self.inner.messages_before(room_id, cursor, limit)).await
    }

    async fn latest_messages(&self, room_id: i64, limit: i64) -> Result<Vec<Message>, StoreError> {
        self.bounded(self.inner.latest_messages(room_id, limit)).await
    }

    async fn messages_from(&self, room_id: i64, from_id: i64) -> Result<Vec<Message>, StoreError> {
        self.bounded(self.inner.messages_from(room_id, from_id)).await
    }

    async fn has_unread(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.bounded(self.inner.has_unread(user_id)).await
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
