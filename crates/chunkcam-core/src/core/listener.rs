//! Progress listener interface
//!
//! Defines the listener trait the engine reports stage progress through.

use crate::types::{thread_safe_vec, ThreadSafeVec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Refine,
    Hierarchy,
    Sequence,
    Layers,
    Link,
    Bridges,
    Shape,
    Simplify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Refine => "refine",
            Stage::Hierarchy => "hierarchy",
            Stage::Sequence => "sequence",
            Stage::Layers => "layers",
            Stage::Link => "link",
            Stage::Bridges => "bridges",
            Stage::Shape => "shape",
            Stage::Simplify => "simplify",
        };
        f.write_str(name)
    }
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A stage began processing `total` items.
    Started { stage: Stage, total: usize },
    /// `done` of the stage's items are finished.
    Advanced { stage: Stage, done: usize, total: usize },
    /// A stage completed.
    Finished { stage: Stage },
}

/// Listener trait for engine progress
///
/// Implement this trait to receive notifications while chunks are processed.
/// All methods have empty defaults.
pub trait ProgressListener: Send + Sync {
    /// Called when a stage begins
    fn on_stage_started(&self, _stage: Stage, _total: usize) {}

    /// Called after each item of a stage completes
    fn on_progress(&self, _stage: Stage, _done: usize, _total: usize) {}

    /// Called when a stage ends
    fn on_stage_finished(&self, _stage: Stage) {}
}

/// Listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullListener;

impl ProgressListener for NullListener {}

/// Listener that records every event, mostly for tests and the CLI summary.
#[derive(Debug, Clone)]
pub struct CollectingListener {
    events: ThreadSafeVec<ProgressEvent>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self {
            events: thread_safe_vec(),
        }
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Stages that reported completion, in order.
    pub fn finished_stages(&self) -> Vec<Stage> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Finished { stage } => Some(*stage),
                _ => None,
            })
            .collect()
    }
}

impl Default for CollectingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener for CollectingListener {
    fn on_stage_started(&self, stage: Stage, total: usize) {
        self.events
            .lock()
            .push(ProgressEvent::Started { stage, total });
    }

    fn on_progress(&self, stage: Stage, done: usize, total: usize) {
        self.events
            .lock()
            .push(ProgressEvent::Advanced { stage, done, total });
    }

    fn on_stage_finished(&self, stage: Stage) {
        self.events.lock().push(ProgressEvent::Finished { stage });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_listener_records_in_order() {
        let listener = CollectingListener::new();
        listener.on_stage_started(Stage::Sequence, 2);
        listener.on_progress(Stage::Sequence, 1, 2);
        listener.on_stage_finished(Stage::Sequence);
        let events = listener.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            ProgressEvent::Started {
                stage: Stage::Sequence,
                total: 2
            }
        );
        assert_eq!(listener.finished_stages(), vec![Stage::Sequence]);
    }
}
