//! Chat service — room lifecycle and messages.
//!
//! DESIGN
//! ======
//! Every operation takes the authenticated user and checks room
//! participation before touching data. A room the caller is not part of is
//! reported as not found, so room ids do not leak.
//!
//! Message creation applies the blocking filter: when the recipient has
//! blocked the sender, the message is still stored, with `is_blocked` set.
//! Hiding it is left to readers.

use uuid::Uuid;

use crate::store::{ChatRoom, ChatStore, Message, NewMessage, NewRoom, RoomRole, RoomSummary, StoreError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChatError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

impl crate::event::ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "E_AUTH_REQUIRED",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Conflict(_) => "E_CONFLICT",
            Self::Store(StoreError::Database(_)) => "E_DATABASE",
            Self::Store(StoreError::Timeout(_)) => "E_TIMEOUT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Timeout(_)))
    }
}

/// Room detail as seen by one participant.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RoomDetail {
    #[serde(flatten)]
    pub room: ChatRoom,
    pub is_author: bool,
}

// =============================================================================
// ROOMS
// =============================================================================

/// Return the room for the (author, guest) pair, creating it on first contact.
/// The boolean is true when this call created the room.
///
/// # Errors
///
/// `InvalidRequest` if the caller is neither party or both parties are the
/// same user; store errors otherwise.
pub async fn create_room(
    store: &dyn ChatStore,
    caller: Uuid,
    new_room: NewRoom,
) -> Result<(i64, bool), ChatError> {
    if new_room.author_id == new_room.guest_id {
        return Err(ChatError::invalid("author and guest must differ"));
    }
    if caller != new_room.author_id && caller != new_room.guest_id {
        return Err(ChatError::invalid("caller must be the author or the guest"));
    }

    let (room, created) = store.get_or_create_room(new_room).await?;
    if created {
        tracing::info!(room_id = room.id, author_id = %room.author_id, guest_id = %room.guest_id, "chat room created");
    }
    Ok((room.id, created))
}

/// Load a room the user participates in.
///
/// # Errors
///
/// `NotFound` if the room does not exist or the user is not a participant.
pub async fn participant_room(store: &dyn ChatStore, room_id: i64, user_id: Uuid) -> Result<ChatRoom, ChatError> {
    match store.room(room_id).await? {
        Some(room) if room.is_participant(user_id) => Ok(room),
        _ => Err(ChatError::NotFound(format!("chat room {room_id}"))),
    }
}

/// Room detail with an `is_author` flag for the caller.
///
/// # Errors
///
/// `NotFound` if the room does not exist or the user is not a participant.
pub async fn room_detail(store: &dyn ChatStore, room_id: i64, user_id: Uuid) -> Result<RoomDetail, ChatError> {
    let room = participant_room(store, room_id, user_id).await?;
    let is_author = room.author_id == user_id;
    Ok(RoomDetail { room, is_author })
}

/// Rooms where the user is on the given side, newest first.
///
/// # Errors
///
/// Store errors only.
pub async fn list_rooms(store: &dyn ChatStore, user_id: Uuid, role: RoomRole) -> Result<Vec<RoomSummary>, ChatError> {
    Ok(store.rooms_for_user(user_id, role).await?)
}

/// Delete a room and its messages.
///
/// # Errors
///
/// `NotFound` if the room does not exist or the user is not a participant.
pub async fn delete_room(store: &dyn ChatStore, room_id: i64, user_id: Uuid) -> Result<(), ChatError> {
    participant_room(store, room_id, user_id).await?;
    if !store.delete_room(room_id).await? {
        return Err(ChatError::NotFound(format!("chat room {room_id}")));
    }
    tracing::info!(%room_id, %user_id, "chat room deleted");
    Ok(())
}

/// Whether the user has any unread message in any of their rooms.
///
/// # Errors
///
/// Store errors only.
pub async fn has_unread(store: &dyn ChatStore, user_id: Uuid) -> Result<bool, ChatError> {
    Ok(store.has_unread(user_id).await?)
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Persist a message from `sender_id` into `room_id`.
///
/// The row is always written; `is_blocked` is set when the other participant
/// has blocked the sender.
///
/// # Errors
///
/// `InvalidRequest` for empty text, `NotFound` for a room the sender is not
/// part of, store errors otherwise.
pub async fn send_message(
    store: &dyn ChatStore,
    room_id: i64,
    sender_id: Uuid,
    text: &str,
) -> Result<Message, ChatError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatError::invalid("text required"));
    }

    let room = participant_room(store, room_id, sender_id).await?;
    let recipient = room.counterpart(sender_id);
    let is_blocked = store.is_blocked(recipient, sender_id).await?;

    let message = store
        .insert_message(NewMessage { room_id, sender_id, text: text.to_owned(), is_blocked })
        .await?;

    tracing::debug!(%room_id, message_id = message.id, is_blocked, "message stored");
    Ok(message)
}

/// Mark a message read on behalf of `reader_id`.
///
/// # Errors
///
/// `NotFound` if the message does not exist or belongs to a room the reader
/// is not part of; `InvalidRequest` if `room_id` is given and does not match,
/// or if the reader sent the message.
pub async fn mark_read(
    store: &dyn ChatStore,
    message_id: i64,
    room_id: Option<i64>,
    reader_id: Uuid,
) -> Result<Message, ChatError> {
    let Some(message) = store.message(message_id).await? else {
        return Err(ChatError::NotFound(format!("message {message_id}")));
    };
    if let Some(room_id) = room_id {
        if room_id != message.room_id {
            return Err(ChatError::invalid(format!("message {message_id} is not in room {room_id}")));
        }
    }
    let visible = store
        .room(message.room_id)
        .await?
        .is_some_and(|room| room.is_participant(reader_id));
    if !visible {
        return Err(ChatError::NotFound(format!("message {message_id}")));
    }
    // The read flag belongs to the recipient.
    if message.sender_id == reader_id {
        return Err(ChatError::invalid(format!("message {message_id} was sent by the reader")));
    }

    store
        .mark_read(message_id)
        .await?
        .ok_or_else(|| ChatError::NotFound(format!("message {message_id}")))
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
