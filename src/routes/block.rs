//! Block routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::error::{ApiError, ApiJson};
use crate::services::block;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BlockBody {
    pub blocked_id: Option<Uuid>,
}

fn blocked_id(body: &BlockBody) -> Result<Uuid, ApiError> {
    body.blocked_id
        .ok_or_else(|| ApiError::bad_request("Invalid request: Missing required blocked_id."))
}

/// `POST /block`
pub async fn block_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<BlockBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let blocked = blocked_id(&body)?;
    block::block_user(state.store.as_ref(), auth.user.id, blocked).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "ok": true }))))
}

/// `DELETE /block`
pub async fn unblock_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<BlockBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let blocked = blocked_id(&body)?;
    block::unblock_user(state.store.as_ref(), auth.user.id, blocked).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
