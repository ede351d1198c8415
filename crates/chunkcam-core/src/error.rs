//! Error handling for chunkcam
//!
//! Geometry faults are shared by every crate that hands rings to a geometry
//! backend. Settings and engine errors live in their own crates and wrap
//! this one.

use thiserror::Error;

/// Geometry error type
///
/// Represents input geometry that a provider cannot work with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A ring has fewer than three distinct vertices
    #[error("Degenerate ring with {vertices} distinct vertices")]
    DegenerateRing {
        /// The number of distinct vertices found.
        vertices: usize,
    },

    /// A coordinate is NaN or infinite
    #[error("Non-finite coordinate ({x}, {y})")]
    NonFinite {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },
}

impl GeometryError {
    /// Check if the input was merely too small rather than malformed
    pub fn is_degenerate(&self) -> bool {
        matches!(self, GeometryError::DegenerateRing { .. })
    }
}
