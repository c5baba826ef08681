//! Progress handler trait and events

use crate::pipeline::{FailureKind, OverallStatus, TaskName};
use std::time::Duration;
use uuid::Uuid;

/// Events emitted while a pipeline run advances
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run accepted and the graph validated
    RunStarted { run_id: Uuid, request: String },

    /// A dependency layer is about to be scheduled
    LayerStarted { index: usize, tasks: Vec<TaskName> },

    TaskStarted { task: TaskName, attempt: u32 },

    /// A recoverable failure will be retried after `backoff`
    TaskRetrying {
        task: TaskName,
        attempt: u32,
        backoff: Duration,
        kind: FailureKind,
    },

    TaskSucceeded {
        task: TaskName,
        attempts: u32,
        duration: Duration,
    },

    TaskFailed {
        task: TaskName,
        attempts: u32,
        kind: FailureKind,
        message: String,
    },

    TaskSkipped { task: TaskName, reason: String },

    /// Cancellation or the run timeout was observed
    RunCancelled { run_id: Uuid },

    RunCompleted {
        run_id: Uuid,
        status: OverallStatus,
        total_time: Duration,
    },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {
        // Intentionally empty
    }
}
