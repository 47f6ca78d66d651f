use super::*;
use crate::state::test_helpers::{MemoryChatStore, seed_pair};

fn room(author_id: Uuid, guest_id: Uuid) -> ChatRoom {
    ChatRoom {
        id: 1,
        author_id,
        guest_id,
        post_id: None,
        guest_image: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

// =============================================================================
// ChatRoom
// =============================================================================

#[test]
fn participants_and_counterpart() {
    let author = Uuid::new_v4();
    let guest = Uuid::new_v4();
    let room = room(author, guest);

    assert!(room.is_participant(author));
    assert!(room.is_participant(guest));
    assert!(!room.is_participant(Uuid::new_v4()));
    assert_eq!(room.counterpart(author), guest);
    assert_eq!(room.counterpart(guest), author);
}

#[test]
fn room_serializes_rfc3339_timestamp() {
    let value = serde_json::to_value(room(Uuid::nil(), Uuid::nil())).unwrap();
    assert_eq!(value["created_at"], "1970-01-01T00:00:00Z");
}

// =============================================================================
// RoomRole
// =============================================================================

#[test]
fn room_role_parses_wire_names() {
    assert_eq!(RoomRole::parse("AUTHOR"), Some(RoomRole::Author));
    assert_eq!(RoomRole::parse("GUEST"), Some(RoomRole::Guest));
    assert_eq!(RoomRole::parse("guest"), None);
    assert_eq!(RoomRole::parse(""), None);
}

// =============================================================================
// TimedStore
// =============================================================================

#[tokio::test]
async fn timed_store_passes_through_fast_calls() {
    let inner = MemoryChatStore::new();
    let (_author, _guest, room_id) = seed_pair(&inner);
    let store = TimedStore::new(inner, Duration::from_millis(500));

    let found = store.room(room_id).await.unwrap();
    assert_eq!(found.map(|r| r.id), Some(room_id));
}

#[tokio::test]
async fn timed_store_reports_slow_calls_as_timeout() {
    let inner = MemoryChatStore::new();
    let (author, _guest, room_id) = seed_pair(&inner);
    inner.set_delay(Some(Duration::from_millis(200)));
    let limit = Duration::from_millis(20);
    let store = TimedStore::new(inner.clone(), limit);

    let err = store
        .insert_message(NewMessage { room_id, sender_id: author, text: "late".into(), is_blocked: false })
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Timeout(d) if d == limit));
}

#[tokio::test]
async fn timed_store_keeps_inner_errors() {
    let inner = MemoryChatStore::new();
    let author = inner.add_user("author");
    inner.set_fail_writes(true);
    let store = TimedStore::new(inner, Duration::from_millis(500));

    let err = store.create_session("token", author).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
}
