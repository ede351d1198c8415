//! Progress reporting for the CLI

use chunkcam_core::{ProgressListener, Stage};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Logs stage boundaries and every `step`-th item of a stage.
#[derive(Debug)]
pub struct LogListener {
    step: usize,
    items: AtomicUsize,
}

impl LogListener {
    pub fn new(step: usize) -> Self {
        Self {
            step: step.max(1),
            items: AtomicUsize::new(0),
        }
    }

    /// Items reported across all stages so far.
    pub fn items(&self) -> usize {
        self.items.load(Ordering::Relaxed)
    }
}

impl Default for LogListener {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ProgressListener for LogListener {
    fn on_stage_started(&self, stage: Stage, total: usize) {
        debug!("{} started ({} items)", stage, total);
    }

    fn on_progress(&self, stage: Stage, done: usize, total: usize) {
        self.items.fetch_add(1, Ordering::Relaxed);
        if done % self.step == 0 || done == total {
            info!("{}: {}/{}", stage, done, total);
        }
    }

    fn on_stage_finished(&self, stage: Stage) {
        debug!("{} finished", stage);
    }
}
