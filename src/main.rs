mod config;
mod db;
mod event;
mod registry;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{ChatStore, PgChatStore, TimedStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let port = config.port;

    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    let store: Arc<dyn ChatStore> = Arc::new(TimedStore::new(PgChatStore::new(pool), config.store_timeout));
    if config.dev_auth_bypass {
        tracing::warn!("DEV_AUTH_BYPASS enabled: POST /dev/session issues sessions without credentials");
    }
    let state = state::AppState::new(store, config);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "pawtalk listening");
    axum::serve(listener, app).await?;
    Ok(())
}
