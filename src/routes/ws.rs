//! WebSocket handler — room subscriptions and live message relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID and enters a `select!` loop:
//! - Incoming client events → parse + dispatch by event type
//! - Fan-out events from room peers → forward to client
//!
//! Handler functions are pure business logic: they validate, call the chat
//! services, and return an `Outcome`. The dispatch layer owns all outbound
//! concerns: reply to sender and broadcast to the room.
//!
//! LIFECYCLE
//! =========
//! 1. Authenticate (query `token` or `Authorization` header), 401 on failure
//! 2. Upgrade → send `CONNECTED` with `connection_id`
//! 3. Client sends events → dispatch → handler returns Outcome
//! 4. Dispatch applies Outcome (reply / broadcast)
//! 5. Close → `disconnect` from every room

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::{ClientEvent, E_INVALID_EVENT, ErrorCode, MessageData, OpenData, ReadData, ReadReceipt, ServerEvent};
use crate::routes::error::ApiError;
use crate::services::chat::{self, ChatError};
use crate::services::session;
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send events directly.
#[derive(Debug)]
enum Outcome {
    /// Send to the originating connection only.
    Reply(ServerEvent),
    /// Send to every connection subscribed to the room. The sender gets a
    /// direct copy when it has not opened the room itself.
    Broadcast { room_id: i64, event: ServerEvent },
}

// =============================================================================
// UPGRADE
// =============================================================================

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let header_token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(session::bearer_token);
    let token = params.token.as_deref().or(header_token);

    let user = match session::authenticate(state.store.as_ref(), token).await {
        Ok(user) => user,
        Err(e) => {
            warn!(code = e.error_code(), "ws: upgrade rejected");
            return ApiError::from(e).into_response();
        }
    };

    let user_id = user.id;
    ws.on_upgrade(move |socket| run_ws(socket, state, user_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, user_id: Uuid) {
    let connection_id = Uuid::new_v4();

    // Per-connection channel for receiving fan-out events from the registry.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(state.config.ws_channel_capacity);

    let welcome = ServerEvent::Connected { connection_id, user_id };
    if send_event(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%connection_id, %user_id, "ws: client connected");

    'conn: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    WsMessage::Text(text) => {
                        let replies = process_inbound_text(&state, connection_id, user_id, &client_tx, text.as_str()).await;
                        for event in replies {
                            if send_event(&mut socket, &event).await.is_err() {
                                break 'conn;
                            }
                        }
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    state.rooms.disconnect(connection_id).await;
    let active_rooms = state.rooms.room_count().await;
    info!(%connection_id, active_rooms, "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return events for the sender.
///
/// Kept apart from the socket so tests can drive dispatch and fan-out
/// without a live connection.
async fn process_inbound_text(
    state: &AppState,
    connection_id: Uuid,
    user_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%connection_id, error = %e, "ws: invalid inbound event");
            return vec![ServerEvent::error(E_INVALID_EVENT, format!("invalid event: {e}"))];
        }
    };

    let kind = event.kind();
    info!(%connection_id, kind, room_id = event.room_id(), "ws: recv event");

    let result = match event {
        ClientEvent::Open(data) => handle_open(state, connection_id, user_id, client_tx, data).await,
        ClientEvent::Message(data) => handle_message(state, user_id, data).await,
        ClientEvent::Read(data) => handle_read(state, user_id, data).await,
    };

    match result {
        Ok(Outcome::Reply(event)) => vec![event],
        Ok(Outcome::Broadcast { room_id, event }) => {
            let delivered = state.rooms.broadcast(room_id, &event).await;
            debug!(%room_id, kind = event.kind(), delivered, "ws: broadcast");
            if state.rooms.is_subscribed(room_id, connection_id).await {
                vec![]
            } else {
                vec![event]
            }
        }
        Err(e) => {
            warn!(%connection_id, kind, code = e.error_code(), error = %e, "ws: event failed");
            vec![ServerEvent::error_from(&e)]
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn handle_open(
    state: &AppState,
    connection_id: Uuid,
    user_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    data: OpenData,
) -> Result<Outcome, ChatError> {
    let room = match chat::participant_room(state.store.as_ref(), data.room_id, user_id).await {
        Ok(room) => room,
        Err(e) => {
            // Room may have been deleted since an earlier OPEN on this socket.
            if matches!(e, ChatError::NotFound(_)) {
                state.rooms.unsubscribe(data.room_id, connection_id).await;
            }
            return Err(e);
        }
    };
    state.rooms.subscribe(room.id, connection_id, client_tx.clone()).await;
    let connections = state.rooms.connection_count(room.id).await;
    debug!(%connection_id, room_id = room.id, connections, "ws: room opened");
    Ok(Outcome::Reply(ServerEvent::Opened { room_id: room.id }))
}

async fn handle_message(state: &AppState, user_id: Uuid, data: MessageData) -> Result<Outcome, ChatError> {
    if data.sender_id.is_some_and(|claimed| claimed != user_id) {
        return Err(ChatError::invalid("sender_id does not match the authenticated user"));
    }

    // Persist first; nothing is broadcast unless the write succeeded.
    let message = chat::send_message(state.store.as_ref(), data.room_id, user_id, &data.text).await?;
    Ok(Outcome::Broadcast { room_id: message.room_id, event: ServerEvent::Message(message) })
}

async fn handle_read(state: &AppState, user_id: Uuid, data: ReadData) -> Result<Outcome, ChatError> {
    if data.user_id.is_some_and(|claimed| claimed != user_id) {
        return Err(ChatError::invalid("user_id does not match the authenticated user"));
    }

    let message = chat::mark_read(state.store.as_ref(), data.message_id, Some(data.room_id), user_id).await?;
    let receipt = ReadReceipt { message_id: message.id, room_id: message.room_id, user_id };
    Ok(Outcome::Broadcast { room_id: message.room_id, event: ServerEvent::Read(receipt) })
}

// =============================================================================
// TRANSPORT
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Err(());
        }
    };
    if let ServerEvent::Error(err) = event {
        warn!(code = %err.code, message = %err.message, "ws: send event type=ERROR");
    } else {
        debug!(kind = event.kind(), "ws: send event");
    }
    socket.send(WsMessage::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
