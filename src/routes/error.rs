//! HTTP error envelope.
//!
//! Every failed request renders `{"message", "timestamp", "data": null}`.
//! Status comes from the `ChatError` variant unless a handler overrides it.
//! Body rejections go through `ApiJson` so they use the same envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::event::ErrorCode;
use crate::services::chat::ChatError;
use crate::store::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

pub(crate) fn chat_error_to_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        ChatError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Conflict(_) => StatusCode::CONFLICT,
        ChatError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ChatError::Store(StoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status = chat_error_to_status(&err);
        if status.is_server_error() {
            tracing::error!(code = err.error_code(), error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        let body = serde_json::json!({
            "message": self.message,
            "timestamp": timestamp,
            "data": null,
        });
        (self.status, Json(body)).into_response()
    }
}

/// `Json` body extractor whose rejection is an `ApiError` (400) instead of
/// axum's plain-text response.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection_to_error(&rejection)),
        }
    }
}

pub(crate) fn json_rejection_to_error(rejection: &JsonRejection) -> ApiError {
    tracing::debug!(status = %rejection.status(), error = %rejection.body_text(), "request body rejected");
    ApiError::bad_request(format!("Invalid request: {}", rejection.body_text()))
}
