//! chunkcam Settings Crate
//!
//! Cutting parameters and job descriptions, with JSON/TOML persistence and
//! validation.

pub mod config;
pub mod error;

pub use config::{
    CutSide, CuttingParameters, HeightMapSpec, HierarchyPolicy, JobConfig, JoinStyle,
    MovementType, PocketDirection, PolygonSpec, SpindleDirection, Strategy,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
