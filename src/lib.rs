//! # chunkcam
//!
//! Toolpath chunk engine for CNC milling. Offset contours go in; an ordered
//! list of passes comes out, with enclosed islands cut before the shapes
//! around them, depth split into stepdown layers, tabs left standing and
//! entries and exits shaped so the cutter never plunges blind.
//!
//! ## Architecture
//!
//! chunkcam is organized as a workspace with multiple crates:
//!
//! 1. **chunkcam-core** - Point model, errors, cancellation, progress listeners
//! 2. **chunkcam-settings** - Cutting parameters and job files
//! 3. **chunkcam-engine** - Hierarchy, sequencing, layers, bridges, motion shaping
//! 4. **chunkcam** - CLI binary and JSON report

pub mod progress;
pub mod report;

pub use chunkcam_engine as engine;
pub use chunkcam_settings as settings;

pub use chunkcam_core::{
    CancellationToken, GeometryError, OperationId, Point2, Point3, ProgressListener,
    RotationVector, Stage,
};

pub use chunkcam_settings::{CuttingParameters, JobConfig, SettingsError};

pub use chunkcam_engine::{
    compute_layers, plan_job, Chunk, ChunkArena, ChunkEngine, ContourGeometry, EngineError,
    EngineOutput, EngineRequest, EngineStats, Layer,
};

pub use progress::LogListener;
pub use report::{JobReport, PassRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr so reports can go to stdout
/// - RUST_LOG environment variable support
/// - JSON lines instead of text when `json` is set
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
