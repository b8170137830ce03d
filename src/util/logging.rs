// ChatLog - util/logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [logging] level = "debug"
//
// Output: stderr (or the configured log file), so the CLI's rendered view on
// stdout stays clean.
// Message text is only logged at debug level and truncated to
// DEBUG_MAX_TEXT_PREVIEW characters.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Initialise the logging subsystem.
///
/// Priority: RUST_LOG env var > CLI --debug flag > config level > default "info".
///
/// When `log_file` is set and can be opened for appending, output goes there
/// (without ANSI colours) instead of stderr.
pub fn init(debug_flag: bool, config_level: Option<&str>, log_file: Option<&Path>) {
    let filter = resolve_filter(
        std::env::var("RUST_LOG").is_ok(),
        debug_flag,
        config_level,
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    let opened = log_file.map(|path| {
        if let Some(parent) = path.parent() {
            // Failure surfaces through the open below.
            let _ = std::fs::create_dir_all(parent);
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| (path, e))
    });

    // try_init: a second init (e.g. from tests) is ignored rather than panicking.
    let (result, file_error) = match opened {
        Some(Ok(file)) => (
            builder.with_writer(Mutex::new(file)).with_ansi(false).try_init(),
            None,
        ),
        Some(Err(e)) => (builder.with_writer(std::io::stderr).try_init(), Some(e)),
        None => (builder.with_writer(std::io::stderr).try_init(), None),
    };

    if result.is_ok() {
        tracing::debug!(
            app = super::constants::APP_NAME,
            version = super::constants::APP_VERSION,
            "Logging initialised"
        );
    }
    if let Some((path, e)) = file_error {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "Could not open log file; logging to stderr"
        );
    }
}

fn resolve_filter(env_set: bool, debug_flag: bool, config_level: Option<&str>) -> EnvFilter {
    if env_set {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(super::constants::DEFAULT_LOG_LEVEL)
    }
}

/// Shorten message text for debug logging.
pub fn preview(text: &str) -> String {
    let max = super::constants::DEBUG_MAX_TEXT_PREVIEW;
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max).collect();
        cut.push('…');
        cut
    }
}
