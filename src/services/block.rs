//! User blocks. A block is directional: `blocker` stops seeing `blocked`.

use uuid::Uuid;

use crate::services::chat::ChatError;
use crate::store::ChatStore;

/// # Errors
///
/// `InvalidRequest` for a self-block, `Conflict` if the block already exists.
pub async fn block_user(store: &dyn ChatStore, blocker_id: Uuid, blocked_id: Uuid) -> Result<(), ChatError> {
    if blocker_id == blocked_id {
        return Err(ChatError::invalid("cannot block yourself"));
    }
    if !store.insert_block(blocker_id, blocked_id).await? {
        return Err(ChatError::Conflict(format!("user {blocked_id} is already blocked")));
    }
    tracing::info!(%blocker_id, %blocked_id, "user blocked");
    Ok(())
}

/// # Errors
///
/// `NotFound` if there was no such block.
pub async fn unblock_user(store: &dyn ChatStore, blocker_id: Uuid, blocked_id: Uuid) -> Result<(), ChatError> {
    if !store.delete_block(blocker_id, blocked_id).await? {
        return Err(ChatError::NotFound(format!("block on user {blocked_id}")));
    }
    tracing::info!(%blocker_id, %blocked_id, "user unblocked");
    Ok(())
}

#[cfg(test)]
#[path = "block_test.rs"]
mod tests;
