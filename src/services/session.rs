//! Session tokens — generation and validation.
//!
//! ARCHITECTURE
//! ============
//! Identity is an opaque random token stored in the `sessions` table. HTTP
//! callers send it as `Authorization: Bearer <token>`; websocket callers may
//! pass it as a `token` query parameter since browsers cannot set headers on
//! the upgrade request.

use std::fmt::Write;

use rand::Rng;

use crate::services::chat::ChatError;
use crate::store::{ChatStore, SessionUser};

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Extract the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` and a bare token.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    if header.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => header,
    };
    (!token.is_empty()).then_some(token)
}

/// Resolve a token to its user.
///
/// # Errors
///
/// `AuthenticationRequired` for a missing, unknown, or expired token; store
/// errors otherwise.
pub async fn authenticate(store: &dyn ChatStore, token: Option<&str>) -> Result<SessionUser, ChatError> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Err(ChatError::AuthenticationRequired);
    };
    store
        .session_user(token)
        .await?
        .ok_or(ChatError::AuthenticationRequired)
}

/// Create a fresh user with a session. Only reachable when the dev bypass is on.
///
/// # Errors
///
/// Store errors only.
pub async fn create_dev_session(store: &dyn ChatStore, name: &str) -> Result<(String, SessionUser), ChatError> {
    let user_id = store.create_user(name).await?;
    let token = generate_token();
    store.create_session(&token, user_id).await?;
    tracing::info!(%user_id, "dev session created");
    Ok((token, SessionUser { id: user_id, name: name.to_owned() }))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
