//! Task identities and the per-run task state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The five fixed pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    VideoAnalysis,
    RepositoryAnalysis,
    ApplicationBuild,
    TrendAnalysis,
    Monetization,
}

impl TaskName {
    /// Declaration order. Layers preserve this order for tasks that become ready together.
    pub const ALL: [TaskName; 5] = [
        TaskName::VideoAnalysis,
        TaskName::RepositoryAnalysis,
        TaskName::ApplicationBuild,
        TaskName::TrendAnalysis,
        TaskName::Monetization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskName::VideoAnalysis => "video_analysis",
            TaskName::RepositoryAnalysis => "repository_analysis",
            TaskName::ApplicationBuild => "application_build",
            TaskName::TrendAnalysis => "trend_analysis",
            TaskName::Monetization => "monetization",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TaskName::VideoAnalysis => "Video Analysis",
            TaskName::RepositoryAnalysis => "Repository Analysis",
            TaskName::ApplicationBuild => "Application Build",
            TaskName::TrendAnalysis => "Trend Analysis",
            TaskName::Monetization => "Monetization",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one task within one run
///
/// `Pending -> Running -> {Succeeded, Failed, Skipped}`. A task may re-enter
/// `Running` while it is being retried; `Skipped` is only reachable from
/// `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Skipped
        )
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Running)
                | (TaskState::Pending, TaskState::Skipped)
                | (TaskState::Running, TaskState::Running)
                | (TaskState::Running, TaskState::Succeeded)
                | (TaskState::Running, TaskState::Failed)
        )
    }

    /// The next state, or an error when the move is not allowed
    pub fn transition(self, next: TaskState) -> Result<TaskState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal task state transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TaskState,
    pub to: TaskState,
}
