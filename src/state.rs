//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the storage collaborator (already wrapped in `TimedStore`), the
//! room fan-out registry, and the parsed config.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::registry::RoomRegistry;
use crate::store::ChatStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub rooms: RoomRegistry,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn ChatStore>, config: AppConfig) -> Self {
        Self { store, rooms: RoomRegistry::new(), config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;
