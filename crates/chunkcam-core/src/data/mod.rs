//! Data models shared across the workspace.
//!
//! - [`Point2`] / [`Point3`]: planar and spatial coordinates in millimetres
//! - [`RotationVector`]: rotary axis angles for 4 and 5 axis chunks
//! - [`Bounds2`]: axis-aligned planar bounding box

mod point;

pub use point::{Bounds2, Point2, Point3, RotationVector};
