//! Message pagination — cursor windows and the unread-anchored initial window.
//!
//! DESIGN
//! ======
//! Message ids are the only ordering key; timestamps are never consulted, so
//! windows stay stable under clock skew. Every window is returned ascending.
//!
//! - NEXT: up to `PAGE_SIZE` ids strictly after the cursor.
//! - PREVIOUS: up to `PAGE_SIZE` ids strictly before the cursor (fetched
//!   newest-first, then reversed).
//! - INITIAL: anchored on the viewer's first unread message `u`. The window
//!   is up to `READ_CONTEXT` messages before `u` followed by every message
//!   from `u` on. The unread side is intentionally unbounded: unread content
//!   is never truncated. With nothing unread, the newest `PAGE_SIZE`.

use uuid::Uuid;

use crate::services::chat::ChatError;
use crate::store::{ChatStore, Message};

pub const PAGE_SIZE: i64 = 20;
pub const READ_CONTEXT: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "NEXT" => Some(Self::Next),
            "PREVIOUS" => Some(Self::Previous),
            _ => None,
        }
    }
}

/// Resolved window request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Next { cursor: i64 },
    Previous { cursor: i64 },
    Initial,
}

impl Window {
    /// Resolve raw `offset` / `direction` query values.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when a direction has no cursor, a cursor has no
    /// direction, or either value does not parse.
    pub fn resolve(cursor: Option<&str>, direction: Option<&str>) -> Result<Self, ChatError> {
        let cursor = cursor.map(str::trim).filter(|s| !s.is_empty());
        let direction = direction.map(str::trim).filter(|s| !s.is_empty());

        match (cursor, direction) {
            (None, None) => Ok(Self::Initial),
            (Some(_), None) => Err(ChatError::invalid("direction is required with offset")),
            (cursor, Some(raw_direction)) => {
                let direction = Direction::parse(raw_direction)
                    .ok_or_else(|| ChatError::invalid(format!("unknown direction: {raw_direction}")))?;
                let Some(raw_cursor) = cursor else {
                    return Err(ChatError::invalid("offset is missing"));
                };
                let cursor = raw_cursor
                    .parse::<i64>()
                    .map_err(|_| ChatError::invalid(format!("invalid offset: {raw_cursor}")))?;
                Ok(match direction {
                    Direction::Next => Self::Next { cursor },
                    Direction::Previous => Self::Previous { cursor },
                })
            }
        }
    }
}

/// Fetch one window of messages for `viewer_id` in `room_id`, ascending by id.
///
/// Room access is the caller's concern; this only reads messages.
///
/// # Errors
///
/// Store errors only.
pub async fn fetch_window(
    store: &dyn ChatStore,
    room_id: i64,
    viewer_id: Uuid,
    window: Window,
) -> Result<Vec<Message>, ChatError> {
    let messages = match window {
        Window::Next { cursor } => store.messages_after(room_id, cursor, PAGE_SIZE).await?,
        Window::Previous { cursor } => {
            let mut older = store.messages_before(room_id, cursor, PAGE_SIZE).await?;
            older.reverse();
            older
        }
        Window::Initial => initial_window(store, room_id, viewer_id).await?,
    };
    Ok(messages)
}

async fn initial_window(store: &dyn ChatStore, room_id: i64, viewer_id: Uuid) -> Result<Vec<Message>, ChatError> {
    let Some(first_unread) = store.first_unread(room_id, viewer_id).await? else {
        let mut tail = store.latest_messages(room_id, PAGE_SIZE).await?;
        tail.reverse();
        return Ok(tail);
    };

    let mut window = store.messages_before(room_id, first_unread, READ_CONTEXT).await?;
    window.reverse();
    window.extend(store.messages_from(room_id, first_unread).await?);
    Ok(window)
}

#[cfg(test)]
#[path = "pagination_test.rs"]
mod tests;
