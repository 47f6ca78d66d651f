//! Auth routes — bearer-token extractor and the dev session bootstrap.

use axum::body::Bytes;
use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::error::ApiError;
use crate::services::session;
use crate::state::AppState;
use crate::store::SessionUser;

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the `Authorization` header.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: SessionUser,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(session::bearer_token);

        let app_state = AppState::from_ref(state);
        let user = session::authenticate(app_state.store.as_ref(), token).await?;
        Ok(Self { user })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize, Default)]
pub struct DevSessionBody {
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct DevSessionResponse {
    pub token: String,
    pub user_id: Uuid,
}

/// `POST /dev/session` — create a throwaway user and session.
/// 404 unless `DEV_AUTH_BYPASS` is enabled.
pub async fn dev_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<DevSessionResponse>), ApiError> {
    if !state.config.dev_auth_bypass {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "not found"));
    }

    // Body is optional; an empty request gets a default name.
    let body: DevSessionBody = if body.is_empty() {
        DevSessionBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("invalid body: {e}")))?
    };
    let name = body
        .name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "dev user".to_owned());

    let (token, user) = session::create_dev_session(state.store.as_ref(), &name).await?;
    Ok((StatusCode::CREATED, Json(DevSessionResponse { token, user_id: user.id })))
}
