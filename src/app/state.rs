// ChatLog - app/state.rs
//
// Session state: owns the one message store for this process and hands
// clones of it to producers and consumers. Nothing reaches the store
// through a global.

use crate::app::reconcile::ReconcileManager;
use crate::app::store::MessageStore;
use crate::app::view::ChatView;
use crate::platform::config::AppConfig;
use std::time::Duration;

/// Top-level application state.
#[derive(Debug)]
pub struct AppState {
    /// The session's chat log.
    pub store: MessageStore,

    /// Validated configuration.
    pub config: AppConfig,

    /// Non-fatal configuration warnings collected at startup.
    pub warnings: Vec<String>,
}

impl AppState {
    /// Create session state with a fresh store.
    pub fn new(config: AppConfig, warnings: Vec<String>) -> Self {
        Self::with_store(MessageStore::new(), config, warnings)
    }

    /// Create session state around an existing store.
    pub fn with_store(store: MessageStore, config: AppConfig, warnings: Vec<String>) -> Self {
        Self {
            store,
            config,
            warnings,
        }
    }

    /// A view configured with the session's time format.
    pub fn new_view(&self) -> ChatView {
        ChatView::new(self.config.time_format.clone())
    }

    /// A reconcile manager configured with the session's wait slice.
    /// Call `start(&state.store)` to begin streaming updates.
    pub fn new_reconcile_manager(&self) -> ReconcileManager {
        ReconcileManager::with_wait_slice(Duration::from_millis(self.config.wait_slice_ms))
    }
}
