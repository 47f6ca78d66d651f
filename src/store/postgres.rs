//! Postgres implementation of `ChatStore`.
//!
//! Room creation relies on the `UNIQUE (author_id, guest_id)` index:
//! `ON CONFLICT DO NOTHING` makes concurrent creates for the same pair
//! converge on a single row.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use super::{ChatRoom, ChatStore, Message, NewMessage, NewRoom, RoomRole, RoomSummary, SessionUser, StoreError};

#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ChatStore for PgChatStore {
    async fn session_user(&self, token: &str) -> Result<Option<SessionUser>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT u.id, u.name
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name)| SessionUser { id, name }))
    }

    async fn create_user(&self, name: &str) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar("INSERT INTO users (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn create_session(&self, token: &str, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_or_create_room(&self, room: NewRoom) -> Result<(ChatRoom, bool), StoreError> {
        let inserted = sqlx::query_as::<_, ChatRoom>(
            "INSERT INTO chat_rooms (author_id, guest_id, post_id, guest_image)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (author_id, guest_id) DO NOTHING
             RETURNING id, author_id, guest_id, post_id, guest_image, created_at",
        )
        .bind(room.author_id)
        .bind(room.guest_id)
        .bind(room.post_id)
        .bind(&room.guest_image)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(created) = inserted {
            return Ok((created, true));
        }

        let existing = sqlx::query_as::<_, ChatRoom>(
            "SELECT id, author_id, guest_id, post_id, guest_image, created_at
             FROM chat_rooms
             WHERE author_id = $1 AND guest_id = $2",
        )
        .bind(room.author_id)
        .bind(room.guest_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((existing, false))
    }

    async fn room(&self, room_id: i64) -> Result<Option<ChatRoom>, StoreError> {
        let room = sqlx::query_as::<_, ChatRoom>(
            "SELECT id, author_id, guest_id, post_id, guest_image, created_at FROM chat_rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(room)
    }

    async fn rooms_for_user(&self, user_id: Uuid, role: RoomRole) -> Result<Vec<RoomSummary>, StoreError> {
        let filter = match role {
            RoomRole::Author => "r.author_id = $1",
            RoomRole::Guest => "r.guest_id = $1",
        };
        let sql = format!(
            "SELECT r.id, r.author_id, r.guest_id, r.post_id, r.guest_image, r.created_at,
                    (SELECT COUNT(*) FROM messages m
                     WHERE m.room_id = r.id AND m.sender_id <> $1 AND m.is_read = false) AS unread_count
             FROM chat_rooms r
             WHERE {filter}
             ORDER BY r.id DESC"
        );

        let rows = sqlx::query_as::<_, RoomWithUnread>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let room_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut last_messages: HashMap<i64, Message> = HashMap::new();
        if !room_ids.is_empty() {
            let latest = sqlx::query_as::<_, Message>(
                "SELECT DISTINCT ON (room_id) id, room_id, sender_id, text, sent_at, is_read, is_blocked
                 FROM messages
                 WHERE room_id = ANY($1)
                 ORDER BY room_id, id DESC",
            )
            .bind(&room_ids)
            .fetch_all(&self.pool)
            .await?;
            last_messages.extend(latest.into_iter().map(|m| (m.room_id, m)));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let last_message = last_messages.remove(&row.id);
                RoomSummary {
                    room: ChatRoom {
                        id: row.id,
                        author_id: row.author_id,
                        guest_id: row.guest_id,
                        post_id: row.post_id,
                        guest_image: row.guest_image,
                        created_at: row.created_at,
                    },
                    last_message,
                    unread_count: row.unread_count,
                }
            })
            .collect())
    }

    async fn delete_room(&self, room_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM chat_rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM blocks WHERE blocker_id = $1 AND blocked_id = $2)")
                .bind(blocker_id)
                .bind(blocked_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT INTO blocks (blocker_id, blocked_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let row = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (room_id, sender_id, text, is_blocked)
             VALUES ($1, $2, $3, $4)
             RETURNING id, room_id, sender_id, text, sent_at, is_read, is_blocked",
        )
        .bind(message.room_id)
        .bind(message.sender_id)
        .bind(&message.text)
        .bind(message.is_blocked)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn message(&self, message_id: i64) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query_as::<_, Message>(
            "SELECT id, room_id, sender_id, text, sent_at, is_read, is_blocked FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_read(&self, message_id: i64) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query_as::<_, Message>(
            "UPDATE messages SET is_read = true
             WHERE id = $1
             RETURNING id, room_id, sender_id, text, sent_at, is_read, is_blocked",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn first_unread(&self, room_id: i64, viewer_id: Uuid) -> Result<Option<i64>, StoreError> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT MIN(id) FROM messages WHERE room_id = $1 AND sender_id <> $2 AND is_read = false",
        )
        .bind(room_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn messages_after(&self, room_id: i64, cursor: i64, limit: i64) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT id, room_id, sender_id, text, sent_at, is_read, is_blocked
             FROM messages
             WHERE room_id = $1 AND id > $2
             ORDER BY id ASC
             LIMIT $3",
        )
        .bind(room_id)
        .bind(cursor)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn messages_before(&self, room_id: i64, cursor: i64, limit: i64) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT id, room_id, sender_id, text, sent_at, is_read, is_blocked
             FROM messages
             WHERE room_id = $1 AND id < $2
             ORDER BY id DESC
             LIMIT $3",
        )
        .bind(room_id)
        .bind(cursor)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn latest_messages(&self, room_id: i64, limit: i64) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT id, room_id, sender_id, text, sent_at, is_read, is_blocked
             FROM messages
             WHERE room_id = $1
             ORDER BY id DESC
             LIMIT $2",
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn messages_from(&self, room_id: i64, from_id: i64) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT id, room_id, sender_id, text, sent_at, is_read, is_blocked
             FROM messages
             WHERE room_id = $1 AND id >= $2
             ORDER BY id ASC",
        )
        .bind(room_id)
        .bind(from_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn has_unread(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1
                FROM messages m
                JOIN chat_rooms r ON r.id = m.room_id
                WHERE (r.author_id = $1 OR r.guest_id = $1)
                  AND m.sender_id <> $1
                  AND m.is_read = false
            )",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[derive(sqlx::FromRow)]
struct RoomWithUnread {
    id: i64,
    author_id: Uuid,
    guest_id: Uuid,
    post_id: Option<i64>,
    guest_image: Option<String>,
    created_at: time::OffsetDateTime,
    unread_count: i64,
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "postgres_test.rs"]
mod tests;
