// ChatLog - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
//
// The store, diff engine, and reconciler are total and never produce errors.
// Everything here belongs to the surrounding application: configuration
// loading and the CLI's stdin/stdout handling.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for ChatLog operations.
#[derive(Debug)]
pub enum ChatLogError {
    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with context about what was being done.
    Io {
        operation: &'static str,
        source: io::Error,
    },

    /// JSON serialisation of an edit script failed.
    Json {
        operation: &'static str,
        source: serde_json::Error,
    },
}

impl fmt::Display for ChatLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io { operation, source } => {
                write!(f, "I/O error during {operation}: {source}")
            }
            Self::Json { operation, source } => {
                write!(f, "JSON error during {operation}: {source}")
            }
        }
    }
}

impl std::error::Error for ChatLogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for ChatLogError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for ChatLog results.
pub type Result<T> = std::result::Result<T, ChatLogError>;
