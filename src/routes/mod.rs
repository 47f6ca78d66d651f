//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router carries the chat REST API, the block endpoints, the
//! websocket upgrade at `/chat/ws`, and a health probe. CORS and request
//! tracing are applied as tower layers around the whole router.

pub mod auth;
pub mod block;
pub mod chat;
pub mod error;
pub mod ws;

use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, patch, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsOrigins;
use crate::state::AppState;

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::from(Any),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(%origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/chat", get(chat::room_detail).post(chat::create_room).delete(chat::delete_room))
        .route("/chats", get(chat::list_rooms))
        .route("/chat/unread", get(chat::unread))
        .route("/chat/message/read", patch(chat::mark_read))
        .route("/chat/message/{id}", get(chat::list_messages))
        .route("/chat/ws", get(ws::handle_ws))
        .route("/block", post(block::block_user).delete(block::unblock_user))
        .route("/dev/session", post(auth::dev_session))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
