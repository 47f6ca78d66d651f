//! Room fan-out registry — room id → live connections.
//!
//! DESIGN
//! ======
//! Each connection owns an `mpsc` channel; the registry holds the sending
//! half under every room the connection has opened. Broadcasting is a
//! best-effort `try_send` to each sender, so a slow client never blocks the
//! event that produced the broadcast.
//!
//! Connections are keyed by `connection_id`, so re-opening the same room on
//! one socket is idempotent. The websocket loop calls `disconnect` when the
//! socket closes, and `broadcast` prunes any sender whose receiver is gone,
//! so dead handles do not accumulate.
//!
//! The registry is an owned value held by `AppState`, not a global; tests
//! build as many independent registries as they like.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::event::ServerEvent;

type Connections = HashMap<Uuid, mpsc::Sender<ServerEvent>>;

#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<i64, Connections>>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room entry if absent.
    pub async fn subscribe(&self, room_id: i64, connection_id: Uuid, tx: mpsc::Sender<ServerEvent>) {
        let mut rooms = self.rooms.write().await;
        let connections = rooms.entry(room_id).or_default();
        connections.insert(connection_id, tx);
        debug!(%room_id, %connection_id, connections = connections.len(), "registry: subscribed");
    }

    /// Remove a connection from one room. Drops the room entry when empty.
    pub async fn unsubscribe(&self, room_id: i64, connection_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        let Some(connections) = rooms.get_mut(&room_id) else {
            return;
        };
        connections.remove(&connection_id);
        if connections.is_empty() {
            rooms.remove(&room_id);
        }
    }

    /// Remove a connection from every room it is subscribed to.
    pub async fn disconnect(&self, connection_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, connections| {
            connections.remove(&connection_id);
            !connections.is_empty()
        });
    }

    /// Drop a room and all its subscriptions.
    pub async fn close_room(&self, room_id: i64) {
        self.rooms.write().await.remove(&room_id);
    }

    /// Send `event` to every connection in the room. Returns how many
    /// connections accepted it. Unknown rooms are a silent no-op.
    pub async fn broadcast(&self, room_id: i64, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let rooms = self.rooms.read().await;
            let Some(connections) = rooms.get(&room_id) else {
                return 0;
            };

            for (connection_id, tx) in connections {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(%room_id, %connection_id, kind = event.kind(), "registry: channel full, event dropped");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*connection_id),
                }
            }
        }

        if !closed.is_empty() {
            let mut rooms = self.rooms.write().await;
            if let Some(connections) = rooms.get_mut(&room_id) {
                for connection_id in &closed {
                    connections.remove(connection_id);
                }
                if connections.is_empty() {
                    rooms.remove(&room_id);
                }
            }
            debug!(%room_id, pruned = closed.len(), "registry: pruned closed connections");
        }

        delivered
    }

    /// Number of connections currently subscribed to a room.
    pub async fn connection_count(&self, room_id: i64) -> usize {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .map_or(0, HashMap::len)
    }

    pub async fn is_subscribed(&self, room_id: i64, connection_id: Uuid) -> bool {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .is_some_and(|connections| connections.contains_key(&connection_id))
    }

    /// Number of rooms with at least one connection.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
