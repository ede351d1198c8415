//! JSON report of a finished engine run
//!
//! The report is what downstream emitters read: passes in cut order, the
//! tab curve side channel, warnings and summary counters.

use chrono::{DateTime, Utc};
use chunkcam_core::{OperationId, Point3, RotationVector};
use chunkcam_engine::{ChunkId, EngineOutput, EngineStats, EngineWarning, ScheduledPass};
use serde::Serialize;
use std::path::Path;

/// One pass as written to the report.
#[derive(Debug, Clone, Serialize)]
pub struct PassRecord {
    pub layer: usize,
    pub z_top: f64,
    pub z_bottom: f64,
    pub sources: Vec<ChunkId>,
    pub closed: bool,
    pub points: Vec<Point3>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub startpoints: Vec<Point3>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Point3>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rotations: Vec<RotationVector>,
}

impl From<&ScheduledPass> for PassRecord {
    fn from(pass: &ScheduledPass) -> Self {
        let chunk = &pass.chunk;
        Self {
            layer: pass.layer_index,
            z_top: pass.layer.start,
            z_bottom: pass.layer.end,
            sources: pass.sources.clone(),
            closed: chunk.is_closed(),
            points: chunk.points().to_vec(),
            startpoints: chunk.startpoints().to_vec(),
            endpoints: chunk.endpoints().to_vec(),
            rotations: chunk.rotations().to_vec(),
        }
    }
}

/// Serialized result of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub operation: OperationId,
    pub passes: Vec<PassRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tab_curve: Vec<Vec<Point3>>,
    pub warnings: Vec<EngineWarning>,
    pub stats: EngineStats,
}

impl JobReport {
    pub fn new(job: &str, output: &EngineOutput) -> Self {
        Self {
            job: job.to_string(),
            version: crate::VERSION.to_string(),
            generated_at: Utc::now(),
            operation: output.operation,
            passes: output.passes.iter().map(PassRecord::from).collect(),
            tab_curve: output.tab_curve.clone(),
            warnings: output.warnings.clone(),
            stats: output.stats.clone(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("writing report to {}", path.display()))
    }
}
