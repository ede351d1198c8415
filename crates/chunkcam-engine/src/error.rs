//! Error types for the chunk engine.
//!
//! Fatal configuration faults, geometry backend failures and the distinct
//! cancellation outcome. Recoverable anomalies are not errors; they are
//! reported as [`EngineWarning`]s next to the result.

use crate::chunk::ChunkId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors that abort an engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The start depth is not above the end depth.
    #[error("Start depth {start} must be above end depth {end}")]
    InvalidDepthRange { start: f64, end: f64 },

    /// A parameter cannot be used for this operation.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The geometry backend rejected its input.
    #[error(transparent)]
    Geometry(#[from] chunkcam_core::GeometryError),

    /// The operation was cancelled between chunks or layers.
    #[error("Operation cancelled")]
    Cancelled,
}

impl EngineError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if the operation was cancelled rather than failed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }

    /// Check if this is a configuration fault surfaced to the user
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidDepthRange { .. } | EngineError::InvalidParameter { .. }
        )
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Kind of recoverable anomaly met while computing paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A chunk had containing candidates but none qualified as innermost parent.
    AmbiguousParent,
    /// The helix footprint left the material; a zig-zag ramp was used instead.
    HelixDidNotFit,
}

/// A recoverable anomaly, logged and returned alongside the paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineWarning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<ChunkId>,
    pub message: String,
}

impl EngineWarning {
    pub fn new(kind: WarningKind, chunk: Option<ChunkId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            chunk,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chunk {
            Some(id) => write!(f, "chunk {}: {}", id, self.message),
            None => f.write_str(&self.message),
        }
    }
}
