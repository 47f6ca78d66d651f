use super::*;
use tokio::time::{Duration, timeout};

async fn recv_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("event receive timed out")
        .expect("channel closed")
}

async fn assert_channel_empty(rx: &mut mpsc::Receiver<ServerEvent>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected channel to remain empty"
    );
}

#[tokio::test]
async fn broadcast_reaches_room_members_only() {
    let registry = RoomRegistry::new();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    let (tx_c, mut rx_c) = mpsc::channel(8);

    registry.subscribe(1, Uuid::new_v4(), tx_a).await;
    registry.subscribe(1, Uuid::new_v4(), tx_b).await;
    registry.subscribe(2, Uuid::new_v4(), tx_c).await;

    let delivered = registry.broadcast(1, &ServerEvent::Opened { room_id: 1 }).await;

    assert_eq!(delivered, 2);
    assert_eq!(recv_event(&mut rx_a).await, ServerEvent::Opened { room_id: 1 });
    assert_eq!(recv_event(&mut rx_b).await, ServerEvent::Opened { room_id: 1 });
    assert_channel_empty(&mut rx_c).await;
}

#[tokio::test]
async fn broadcast_to_unknown_room_is_noop() {
    let registry = RoomRegistry::new();
    assert_eq!(registry.broadcast(99, &ServerEvent::Opened { room_id: 99 }).await, 0);
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn resubscribing_same_connection_does_not_duplicate_delivery() {
    let registry = RoomRegistry::new();
    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(8);

    registry.subscribe(5, connection_id, tx.clone()).await;
    registry.subscribe(5, connection_id, tx).await;

    assert_eq!(registry.connection_count(5).await, 1);
    assert_eq!(registry.broadcast(5, &ServerEvent::Opened { room_id: 5 }).await, 1);
    recv_event(&mut rx).await;
    assert_channel_empty(&mut rx).await;
}

#[tokio::test]
async fn one_connection_can_join_several_rooms() {
    let registry = RoomRegistry::new();
    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(8);

    registry.subscribe(1, connection_id, tx.clone()).await;
    registry.subscribe(2, connection_id, tx).await;

    registry.broadcast(2, &ServerEvent::Opened { room_id: 2 }).await;
    assert_eq!(recv_event(&mut rx).await, ServerEvent::Opened { room_id: 2 });
    assert_eq!(registry.room_count().await, 2);
}

#[tokio::test]
async fn broadcast_prunes_closed_connections() {
    let registry = RoomRegistry::new();
    let (live_tx, mut live_rx) = mpsc::channel(8);
    let (dead_tx, dead_rx) = mpsc::channel(8);
    registry.subscribe(3, Uuid::new_v4(), live_tx).await;
    registry.subscribe(3, Uuid::new_v4(), dead_tx).await;
    drop(dead_rx);

    let delivered = registry.broadcast(3, &ServerEvent::Opened { room_id: 3 }).await;

    assert_eq!(delivered, 1);
    assert_eq!(registry.connection_count(3).await, 1);
    recv_event(&mut live_rx).await;
}

#[tokio::test]
async fn room_entry_removed_when_last_connection_pruned() {
    let registry = RoomRegistry::new();
    let (tx, rx) = mpsc::channel(8);
    registry.subscribe(4, Uuid::new_v4(), tx).await;
    drop(rx);

    registry.broadcast(4, &ServerEvent::Opened { room_id: 4 }).await;
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn full_channel_is_skipped_but_kept() {
    let registry = RoomRegistry::new();
    let (tx, mut rx) = mpsc::channel(1);
    registry.subscribe(6, Uuid::new_v4(), tx).await;

    assert_eq!(registry.broadcast(6, &ServerEvent::Opened { room_id: 6 }).await, 1);
    assert_eq!(registry.broadcast(6, &ServerEvent::Opened { room_id: 6 }).await, 0);
    assert_eq!(registry.connection_count(6).await, 1);
    recv_event(&mut rx).await;
}

#[tokio::test]
async fn disconnect_removes_connection_from_every_room() {
    let registry = RoomRegistry::new();
    let leaving = Uuid::new_v4();
    let staying = Uuid::new_v4();
    let (tx_leaving, _rx_leaving) = mpsc::channel(8);
    let (tx_staying, _rx_staying) = mpsc::channel(8);

    registry.subscribe(1, leaving, tx_leaving.clone()).await;
    registry.subscribe(2, leaving, tx_leaving).await;
    registry.subscribe(2, staying, tx_staying).await;

    registry.disconnect(leaving).await;

    assert_eq!(registry.connection_count(1).await, 0);
    assert_eq!(registry.connection_count(2).await, 1);
    assert_eq!(registry.room_count().await, 1);
}

#[tokio::test]
async fn unsubscribe_and_close_room() {
    let registry = RoomRegistry::new();
    let a = Uuid::new_v4();
    let (tx_a, _rx_a) = mpsc::channel(8);
    let (tx_b, _rx_b) = mpsc::channel(8);
    registry.subscribe(8, a, tx_a).await;
    registry.subscribe(8, Uuid::new_v4(), tx_b).await;

    assert!(registry.is_subscribed(8, a).await);

    registry.unsubscribe(8, a).await;
    assert!(!registry.is_subscribed(8, a).await);
    assert_eq!(registry.connection_count(8).await, 1);

    registry.close_room(8).await;
    assert_eq!(registry.connection_count(8).await, 0);
}
