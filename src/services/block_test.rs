use super::*;
use crate::state::test_helpers::{MemoryChatStore, seed_pair};

#[tokio::test]
async fn block_then_duplicate_conflicts() {
    let store = MemoryChatStore::new();
    let (author, guest, _room) = seed_pair(&store);

    block_user(&store, guest, author).await.unwrap();
    assert!(store.is_blocked(guest, author).await.unwrap());
    assert!(!store.is_blocked(author, guest).await.unwrap());

    assert!(matches!(block_user(&store, guest, author).await, Err(ChatError::Conflict(_))));
}

#[tokio::test]
async fn self_block_is_invalid() {
    let store = MemoryChatStore::new();
    let user = store.add_user("solo");

    assert!(matches!(block_user(&store, user, user).await, Err(ChatError::InvalidRequest(_))));
}

#[tokio::test]
async fn unblock_removes_block() {
    let store = MemoryChatStore::new();
    let (author, guest, _room) = seed_pair(&store);
    store.block(guest, author);

    unblock_user(&store, guest, author).await.unwrap();
    assert!(!store.is_blocked(guest, author).await.unwrap());
}

#[tokio::test]
async fn unblock_missing_is_not_found() {
    let store = MemoryChatStore::new();
    let (author, guest, _room) = seed_pair(&store);

    assert!(matches!(unblock_user(&store, guest, author).await, Err(ChatError::NotFound(_))));
}
