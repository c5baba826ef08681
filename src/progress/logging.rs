//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use crate::pipeline::OverallStatus;
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { run_id, request } => {
                info!(run_id = %run_id, request = %request, "Starting pipeline run");
            }
            ProgressEvent::LayerStarted { index, tasks } => {
                debug!(layer = index, tasks = ?tasks, "Scheduling layer");
            }
            ProgressEvent::TaskStarted { task, attempt } => {
                info!(task = %task, attempt, "Task started");
            }
            ProgressEvent::TaskRetrying {
                task,
                attempt,
                backoff,
                kind,
            } => {
                warn!(
                    task = %task,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    kind = %kind,
                    "Retrying task"
                );
            }
            ProgressEvent::TaskSucceeded {
                task,
                attempts,
                duration,
            } => {
                info!(
                    task = %task,
                    attempts,
                    duration_ms = duration.as_millis() as u64,
                    "Task succeeded"
                );
            }
            ProgressEvent::TaskFailed {
                task,
                attempts,
                kind,
                message,
            } => {
                warn!(task = %task, attempts, kind = %kind, error = %message, "Task failed");
            }
            ProgressEvent::TaskSkipped { task, reason } => {
                info!(task = %task, reason = %reason, "Task skipped");
            }
            ProgressEvent::RunCancelled { run_id } => {
                warn!(run_id = %run_id, "Run cancelled");
            }
            ProgressEvent::RunCompleted {
                run_id,
                status,
                total_time,
            } => {
                let total_time_ms = total_time.as_millis() as u64;
                match status {
                    OverallStatus::Failed => {
                        warn!(run_id = %run_id, status = %status, total_time_ms, "Run finished")
                    }
                    _ => info!(run_id = %run_id, status = %status, total_time_ms, "Run finished"),
                }
            }
        }
    }
}
