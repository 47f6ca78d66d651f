//! Chat routes — rooms and message history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::event::flexible_id_opt;
use crate::routes::error::{ApiError, ApiJson};
use crate::services::chat::{self, ChatError, RoomDetail};
use crate::services::pagination::{self, Window};
use crate::state::AppState;
use crate::store::{Message, NewRoom, RoomRole, RoomSummary};

// =============================================================================
// REQUEST / RESPONSE SHAPES
// =============================================================================

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub offset: Option<String>,
    pub direction: Option<String>,
}

#[derive(Deserialize)]
pub struct RoomsQuery {
    #[serde(rename = "type")]
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct RoomIdQuery {
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateRoomBody {
    pub author_id: Option<Uuid>,
    pub guest_id: Option<Uuid>,
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub post_id: Option<i64>,
    pub guest_image: Option<String>,
}

#[derive(Deserialize)]
pub struct MarkReadBody {
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RoomIdResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct UnreadResponse {
    pub exists: bool,
}

fn parse_room_id(raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(ApiError::bad_request("Invalid request: Missing required id parameter."));
    };
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid request: invalid chat room id {raw}")))
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /chat/message/{id}?offset&direction` — one page of room history.
///
/// Bad room ids and bad cursors answer 401 on this endpoint.
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(raw_room_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let unauthorized = |err: ChatError| ApiError::from(err).with_status(StatusCode::UNAUTHORIZED);

    let room_id: i64 = raw_room_id
        .trim()
        .parse()
        .map_err(|_| unauthorized(ChatError::invalid(format!("invalid chat room id: {raw_room_id}"))))?;
    let window = Window::resolve(query.offset.as_deref(), query.direction.as_deref()).map_err(unauthorized)?;

    let store = state.store.as_ref();
    chat::participant_room(store, room_id, auth.user.id).await?;
    let messages = pagination::fetch_window(store, room_id, auth.user.id, window).await?;
    Ok(Json(messages))
}

/// `PATCH /chat/message/read` — mark one message read.
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<MarkReadBody>,
) -> Result<Json<Message>, ApiError> {
    let Some(message_id) = body.id else {
        return Err(ApiError::bad_request("Invalid request: Missing required id."));
    };
    let message = chat::mark_read(state.store.as_ref(), message_id, None, auth.user.id).await?;
    Ok(Json(message))
}

/// `POST /chat` — find or create the room for an (author, guest) pair.
/// 201 when created, 200 when an existing room is returned.
pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateRoomBody>,
) -> Result<(StatusCode, Json<RoomIdResponse>), ApiError> {
    let (Some(author_id), Some(guest_id)) = (body.author_id, body.guest_id) else {
        return Err(ApiError::bad_request("Invalid request: author_id and guest_id are required."));
    };
    let new_room = NewRoom { author_id, guest_id, post_id: body.post_id, guest_image: body.guest_image };

    let (id, created) = chat::create_room(state.store.as_ref(), auth.user.id, new_room).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(RoomIdResponse { id })))
}

/// `GET /chats?type=GUEST|AUTHOR` — the caller's rooms on one side.
pub async fn list_rooms(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RoomsQuery>,
) -> Result<Json<Vec<RoomSummary>>, ApiError> {
    let Some(role) = query.role.as_deref().and_then(RoomRole::parse) else {
        return Err(ApiError::bad_request("Invalid request: type must be GUEST or AUTHOR."));
    };
    let rooms = chat::list_rooms(state.store.as_ref(), auth.user.id, role).await?;
    Ok(Json(rooms))
}

/// `GET /chat?id=` — room detail with `is_author`.
pub async fn room_detail(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RoomIdQuery>,
) -> Result<Json<RoomDetail>, ApiError> {
    let room_id = parse_room_id(query.id.as_deref())?;
    let detail = chat::room_detail(state.store.as_ref(), room_id, auth.user.id).await?;
    Ok(Json(detail))
}

/// `DELETE /chat?id=` — delete a room and drop its live subscriptions.
pub async fn delete_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RoomIdQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let room_id = parse_room_id(query.id.as_deref())?;
    chat::delete_room(state.store.as_ref(), room_id, auth.user.id).await?;
    state.rooms.close_room(room_id).await;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `GET /chat/unread` — whether the caller has anything unread.
pub async fn unread(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UnreadResponse>, ApiError> {
    let exists = chat::has_unread(state.store.as_ref(), auth.user.id).await?;
    Ok(Json(UnreadResponse { exists }))
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
