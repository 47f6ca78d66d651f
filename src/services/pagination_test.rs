use super::*;
use crate::state::test_helpers::{MemoryChatStore, seed_pair};

fn ids(messages: &[Message]) -> Vec<i64> {
    messages.iter().map(|m| m.id).collect()
}

// =============================================================================
// Window::resolve
// =============================================================================

#[test]
fn resolve_no_params_is_initial() {
    assert_eq!(Window::resolve(None, None).unwrap(), Window::Initial);
    assert_eq!(Window::resolve(Some(""), Some(" ")).unwrap(), Window::Initial);
}

#[test]
fn resolve_next_and_previous() {
    assert_eq!(Window::resolve(Some("50"), Some("NEXT")).unwrap(), Window::Next { cursor: 50 });
    assert_eq!(Window::resolve(Some("50"), Some("PREVIOUS")).unwrap(), Window::Previous { cursor: 50 });
}

#[test]
fn resolve_direction_without_cursor_is_invalid() {
    let err = Window::resolve(None, Some("NEXT")).unwrap_err();
    assert!(matches!(err, ChatError::InvalidRequest(ref m) if m.contains("offset is missing")));
    assert!(matches!(Window::resolve(None, Some("PREVIOUS")), Err(ChatError::InvalidRequest(_))));
}

#[test]
fn resolve_cursor_without_direction_is_invalid() {
    assert!(matches!(Window::resolve(Some("10"), None), Err(ChatError::InvalidRequest(_))));
}

#[test]
fn resolve_unknown_direction_is_invalid() {
    assert!(matches!(Window::resolve(Some("10"), Some("SIDEWAYS")), Err(ChatError::InvalidRequest(_))));
    // Directions are case-sensitive on the wire.
    assert!(matches!(Window::resolve(Some("10"), Some("next")), Err(ChatError::InvalidRequest(_))));
}

#[test]
fn resolve_non_numeric_cursor_is_invalid() {
    assert!(matches!(Window::resolve(Some("ten"), Some("NEXT")), Err(ChatError::InvalidRequest(_))));
}

// =============================================================================
// NEXT / PREVIOUS
// =============================================================================

#[tokio::test]
async fn next_returns_at_most_a_page_after_cursor() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 1..=60, true);

    let page = fetch_window(&store, room, guest, Window::Next { cursor: 10 }).await.unwrap();

    assert_eq!(ids(&page), (11..=30).collect::<Vec<_>>());
}

#[tokio::test]
async fn next_near_end_returns_remaining_prefix() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 1..=25, true);

    let page = fetch_window(&store, room, guest, Window::Next { cursor: 22 }).await.unwrap();
    assert_eq!(ids(&page), vec![23, 24, 25]);

    let empty = fetch_window(&store, room, guest, Window::Next { cursor: 25 }).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn previous_returns_ascending_page_before_cursor() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 1..=60, true);

    let page = fetch_window(&store, room, guest, Window::Previous { cursor: 50 }).await.unwrap();

    assert_eq!(ids(&page), (30..=49).collect::<Vec<_>>());
}

#[tokio::test]
async fn previous_near_start_returns_fewer() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 1..=10, true);

    let page = fetch_window(&store, room, guest, Window::Previous { cursor: 4 }).await.unwrap();
    assert_eq!(ids(&page), vec![1, 2, 3]);
}

#[tokio::test]
async fn windows_ignore_other_rooms() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    let other_room = store.seed_room(guest, author);
    store.seed_messages(room, author, 1..=5, true);
    store.seed_messages(other_room, author, 6..=9, true);
    store.seed_messages(room, author, 10..=12, true);

    let page = fetch_window(&store, room, guest, Window::Next { cursor: 0 }).await.unwrap();
    assert_eq!(ids(&page), vec![1, 2, 3, 4, 5, 10, 11, 12]);
}

// =============================================================================
// INITIAL
// =============================================================================

#[tokio::test]
async fn initial_with_nothing_unread_returns_tail() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 1..=45, true);

    let page = fetch_window(&store, room, guest, Window::Initial).await.unwrap();
    assert_eq!(ids(&page), (26..=45).collect::<Vec<_>>());
}

#[tokio::test]
async fn initial_with_short_history_returns_everything() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 1..=7, true);

    let page = fetch_window(&store, room, guest, Window::Initial).await.unwrap();
    assert_eq!(ids(&page), (1..=7).collect::<Vec<_>>());
}

#[tokio::test]
async fn initial_on_empty_room_is_empty() {
    let store = MemoryChatStore::new();
    let (_author, guest, room) = seed_pair(&store);

    let page = fetch_window(&store, room, guest, Window::Initial).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn initial_anchors_on_first_unread() {
    // Room with ids 100..130; the viewer's first unread is 120.
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 100..=119, true);
    store.seed_messages(room, author, 120..=130, false);

    let page = fetch_window(&store, room, guest, Window::Initial).await.unwrap();

    assert_eq!(ids(&page), (105..=130).collect::<Vec<_>>());
    assert_eq!(page.iter().filter(|m| !m.is_read).count(), 11);
}

#[tokio::test]
async fn initial_never_truncates_unread() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 1..=30, true);
    store.seed_messages(room, author, 31..=100, false);

    let page = fetch_window(&store, room, guest, Window::Initial).await.unwrap();

    assert_eq!(page.len(), 15 + 70);
    assert_eq!(ids(&page), (16..=100).collect::<Vec<_>>());
}

#[tokio::test]
async fn initial_ignores_viewers_own_unread_messages() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    // The guest's own messages are unread by the author, not by the guest.
    store.seed_messages(room, guest, 1..=40, false);

    let page = fetch_window(&store, room, guest, Window::Initial).await.unwrap();
    assert_eq!(ids(&page), (21..=40).collect::<Vec<_>>());

    // From the author's side the very first message is the anchor.
    let page = fetch_window(&store, room, author, Window::Initial).await.unwrap();
    assert_eq!(ids(&page), (1..=40).collect::<Vec<_>>());
}

#[tokio::test]
async fn initial_includes_read_messages_after_anchor() {
    let store = MemoryChatStore::new();
    let (author, guest, room) = seed_pair(&store);
    store.seed_messages(room, author, 1..=3, true);
    store.seed_messages(room, author, 4..=4, false);
    // Replies from the viewer after the anchor stay in the window.
    store.seed_messages(room, guest, 5..=6, false);

    let page = fetch_window(&store, room, guest, Window::Initial).await.unwrap();
    assert_eq!(ids(&page), vec![1, 2, 3, 4, 5, 6]);
}
