// ChatLog - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for ChatLog configuration and data.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/chatlog/ or %APPDATA%\ChatLog\config\)
    pub config_dir: PathBuf,

    /// Data directory; a relative `[logging] file` is placed here.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[view]` section.
    pub view: ViewSection,
    /// `[reconcile]` section.
    pub reconcile: ReconcileSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[view]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ViewSection {
    /// chrono format string for row time labels.
    pub time_format: Option<String>,
}

/// `[reconcile]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ReconcileSection {
    /// How often the reconcile thread re-checks its cancel flag (ms).
    pub wait_slice_ms: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- View --
    /// chrono format string for row time labels.
    pub time_format: String,

    // -- Reconcile --
    /// Reconcile thread wait slice in ms.
    pub wait_slice_ms: u64,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            time_format: constants::DEFAULT_TIME_FORMAT.to_string(),
            wait_slice_ms: constants::RECONCILE_WAIT_SLICE_MS,
            log_level: None,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Anchor a relative log file path in `data_dir`. Absolute paths are
    /// kept as given.
    pub fn resolve_log_file(&mut self, data_dir: &Path) {
        if let Some(file) = self.log_file.take() {
            self.log_file = Some(if file.is_relative() {
                data_dir.join(file)
            } else {
                file
            });
        }
    }
}

/// Path of config.toml inside `config_dir`.
pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(constants::CONFIG_FILE_NAME)
}

/// Read and parse a config file without validating values.
pub fn read_raw_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unreadable or unparseable, returns defaults with a warning;
/// the application still starts but the user is informed.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let path = config_path(config_dir);

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    let raw = match read_raw_config(&path) {
        Ok(raw) => raw,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            return (AppConfig::default(), vec![msg]);
        }
    };

    tracing::info!(path = %path.display(), "Loaded config.toml");
    validate(raw)
}

/// Validate each raw field against named constants, accumulating warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings: Vec<String> = Vec::new();

    // -- View: time_format --
    if let Some(format) = raw.view.time_format {
        match check_time_format(&format) {
            Ok(()) => config.time_format = format,
            Err(e) => warnings.push(format!(
                "{e}. Using default (\"{}\").",
                constants::DEFAULT_TIME_FORMAT
            )),
        }
    }

    // -- Reconcile: wait_slice_ms --
    if let Some(ms) = raw.reconcile.wait_slice_ms {
        if (constants::MIN_RECONCILE_WAIT_SLICE_MS..=constants::MAX_RECONCILE_WAIT_SLICE_MS)
            .contains(&ms)
        {
            config.wait_slice_ms = ms;
        } else {
            let e = ConfigError::ValueOutOfRange {
                field: "reconcile.wait_slice_ms".to_string(),
                value: ms.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_RECONCILE_WAIT_SLICE_MS,
                    constants::MAX_RECONCILE_WAIT_SLICE_MS
                ),
            };
            warnings.push(format!(
                "{e}. Using default ({}).",
                constants::RECONCILE_WAIT_SLICE_MS
            ));
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(PathBuf::from(file));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Reject empty, overlong, or unparseable chrono format strings.
pub fn check_time_format(format: &str) -> Result<(), ConfigError> {
    use chrono::format::{Item, StrftimeItems};

    let out_of_range = |expected: &str| ConfigError::ValueOutOfRange {
        field: "view.time_format".to_string(),
        value: format.to_string(),
        expected: expected.to_string(),
    };

    if format.is_empty() || format.len() > constants::MAX_TIME_FORMAT_LENGTH {
        return Err(out_of_range(&format!(
            "1-{} characters",
            constants::MAX_TIME_FORMAT_LENGTH
        )));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(out_of_range("a valid chrono strftime format"));
    }
    Ok(())
}
