// ChatLog - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "ChatLog";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "ChatLog";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Message store
// =============================================================================

/// Number of messages retained by the store. The oldest message is evicted
/// on the append that would exceed this.
pub const MESSAGE_CAPACITY: usize = 100;

// =============================================================================
// Reconciliation
// =============================================================================

/// How long the reconcile thread waits on its subscription before checking
/// the cancel flag again (ms).
pub const RECONCILE_WAIT_SLICE_MS: u64 = 100;

/// Minimum user-configurable wait slice (ms).
pub const MIN_RECONCILE_WAIT_SLICE_MS: u64 = 10;

/// Maximum user-configurable wait slice (ms).
pub const MAX_RECONCILE_WAIT_SLICE_MS: u64 = 5_000;

/// Maximum number of view updates drained by `ReconcileManager::poll_updates`
/// in one call. Remaining updates stay queued for the next frame.
pub const MAX_VIEW_UPDATES_PER_FRAME: usize = 200;

// =============================================================================
// View defaults
// =============================================================================

/// chrono format string for the per-row time label.
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";

/// Upper bound on the length of a user-configured time format string.
pub const MAX_TIME_FORMAT_LENGTH: usize = 64;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum number of message characters included in debug output.
pub const DEBUG_MAX_TEXT_PREVIEW: usize = 80;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
