//! Combined per-run report

use super::payload::TaskPayload;
use super::request::Request;
use super::result::{TaskFailure, TaskResult};
use super::task::{TaskName, TaskState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Complete,
    Partial,
    Failed,
}

impl OverallStatus {
    /// Every task succeeded: complete. A critical-path task did not succeed:
    /// failed. Anything else is partial.
    pub fn from_states(request: &Request, states: &[(TaskName, TaskState)]) -> Self {
        let succeeded = |name: TaskName| {
            states
                .iter()
                .any(|(task, state)| *task == name && *state == TaskState::Succeeded)
        };

        if request.critical_path().iter().any(|t| !succeeded(*t)) {
            OverallStatus::Failed
        } else if TaskName::ALL.iter().all(|t| succeeded(*t)) {
            OverallStatus::Complete
        } else {
            OverallStatus::Partial
        }
    }

    /// Process exit code: 0 complete, 2 partial, 1 failed
    pub fn exit_code(self) -> i32 {
        match self {
            OverallStatus::Complete => 0,
            OverallStatus::Partial => 2,
            OverallStatus::Failed => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Complete => "complete",
            OverallStatus::Partial => "partial",
            OverallStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub task: TaskName,
    pub state: TaskState,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<TaskPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<TaskFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl TaskEntry {
    pub fn from_result(task: TaskName, attempts: u32, result: TaskResult) -> Self {
        match result {
            TaskResult::Success(payload) => Self {
                task,
                state: TaskState::Succeeded,
                attempts,
                payload: Some(payload),
                failure: None,
                skip_reason: None,
            },
            TaskResult::Failure(failure) => Self {
                task,
                state: TaskState::Failed,
                attempts,
                payload: None,
                failure: Some(failure),
                skip_reason: None,
            },
        }
    }

    pub fn skipped(task: TaskName, reason: impl Into<String>) -> Self {
        Self {
            task,
            state: TaskState::Skipped,
            attempts: 0,
            payload: None,
            failure: None,
            skip_reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedReport {
    pub run_id: Uuid,
    pub request: Request,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: OverallStatus,
    pub cancelled: bool,
    /// One entry per task in execution order
    pub tasks: Vec<TaskEntry>,
}

impl CombinedReport {
    pub fn entry(&self, task: TaskName) -> Option<&TaskEntry> {
        self.tasks.iter().find(|e| e.task == task)
    }

    pub fn state(&self, task: TaskName) -> Option<TaskState> {
        self.entry(task).map(|e| e.state)
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
