//! Process configuration parsed from environment variables.
//!
//! `.env` is loaded by `main` (via dotenvy) before `AppConfig::from_env`
//! runs, so everything here reads plain process env.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_WS_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),
}

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Upper bound on any single storage call.
    pub store_timeout: Duration,
    /// Outbound buffer per websocket connection.
    pub ws_channel_capacity: usize,
    pub cors_origins: CorsOrigins,
    /// Enables `POST /dev/session` for local testing without an identity provider.
    pub dev_auth_bypass: bool,
}

impl AppConfig {
    /// Build config from the environment.
    ///
    /// Required: `DATABASE_URL`.
    ///
    /// Optional:
    /// - `PORT` (default 8000)
    /// - `DB_MAX_CONNECTIONS` (default 5)
    /// - `STORE_TIMEOUT_MS` (default 5000)
    /// - `WS_CHANNEL_CAPACITY` (default 256)
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated, any origin when unset
    /// - `DEV_AUTH_BYPASS`: boolean, default false
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            store_timeout: Duration::from_millis(env_parse("STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)),
            ws_channel_capacity: env_parse("WS_CHANNEL_CAPACITY", DEFAULT_WS_CHANNEL_CAPACITY).max(1),
            cors_origins: parse_origins(std::env::var("CORS_ALLOWED_ORIGINS").ok().as_deref()),
            dev_auth_bypass: env_bool("DEV_AUTH_BYPASS").unwrap_or(false),
        })
    }

    /// Config with defaults for everything except the database URL.
    #[cfg(test)]
    #[must_use]
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            port: DEFAULT_PORT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            ws_channel_capacity: DEFAULT_WS_CHANNEL_CAPACITY,
            cors_origins: CorsOrigins::Any,
            dev_auth_bypass: false,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn parse_origins(raw: Option<&str>) -> CorsOrigins {
    let Some(raw) = raw else {
        return CorsOrigins::Any;
    };
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
