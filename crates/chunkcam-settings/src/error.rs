//! Error types for the settings crate.
//!
//! Job files fail on I/O, on parsing, or on validation; each keeps enough
//! context for the CLI to point at the offending file or key.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing or validating a job.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The job file could not be read.
    #[error("Failed to read job {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The job file could not be written.
    #[error("Failed to write job {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A parameter value is invalid.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// Malformed JSON job.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML job.
    #[error("TOML error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The job could not be rendered as TOML.
    #[error("TOML error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// A format or range problem.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl SettingsError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        SettingsError::InvalidSetting {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if this is a validation failure rather than an I/O or parse error
    pub fn is_invalid_setting(&self) -> bool {
        matches!(
            self,
            SettingsError::InvalidSetting { .. }
                | SettingsError::Config(ConfigError::ValueOutOfRange { .. })
        )
    }
}

/// Errors related to the job file format or a value's range.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Job files are `.json` or `.toml`.
    #[error("Unsupported job format: {0}")]
    UnsupportedFormat(String),

    /// A configuration value is out of valid range.
    #[error("Value out of range for '{key}': {value}")]
    ValueOutOfRange { key: String, value: String },
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
