//! # chunkcam Core
//!
//! Core types, traits, and utilities for chunkcam.
//! Provides the point model shared by every crate, the geometry error type,
//! cooperative cancellation and progress reporting.

pub mod core;
pub mod data;
pub mod error;
pub mod types;

pub use core::{
    cancel::CancellationToken,
    listener::{CollectingListener, NullListener, ProgressEvent, ProgressListener, Stage},
    OperationId,
};

pub use data::{Bounds2, Point2, Point3, RotationVector};

pub use error::GeometryError;

pub use types::{thread_safe_vec, ThreadSafeVec};

/// Tolerance used when comparing coordinates that were produced by geometry
/// operations rather than copied.
pub const EPSILON: f64 = 1e-9;
