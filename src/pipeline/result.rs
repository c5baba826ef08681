//! Task outcomes and the failure taxonomy

use super::payload::TaskPayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    AccessDenied,
    TransientError,
    QuotaExceeded,
    RateLimited,
    BuildError,
    Cancelled,
    ConfigurationError,
}

impl FailureKind {
    /// Whether a failure of this kind is retried when the collaborator does
    /// not say otherwise
    pub fn default_recoverable(self) -> bool {
        matches!(
            self,
            FailureKind::TransientError | FailureKind::QuotaExceeded | FailureKind::RateLimited
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::AccessDenied => "access_denied",
            FailureKind::TransientError => "transient_error",
            FailureKind::QuotaExceeded => "quota_exceeded",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::BuildError => "build_error",
            FailureKind::Cancelled => "cancelled",
            FailureKind::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
    pub recoverable: bool,
}

impl TaskFailure {
    /// Failure with the kind's default recoverability
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: kind.default_recoverable(),
        }
    }

    pub fn permanent(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: false,
        }
    }

    pub fn recoverable(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: true,
        }
    }

    pub fn cancelled() -> Self {
        Self::permanent(FailureKind::Cancelled, "run was cancelled while the task was running")
    }

    pub fn missing_input(what: &str) -> Self {
        Self::permanent(
            FailureKind::ConfigurationError,
            format!("required input missing: {}", what),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResult {
    Success(TaskPayload),
    Failure(TaskFailure),
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success(_))
    }

    pub fn payload(&self) -> Option<&TaskPayload> {
        match self {
            TaskResult::Success(payload) => Some(payload),
            TaskResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            TaskResult::Success(_) => None,
            TaskResult::Failure(failure) => Some(failure),
        }
    }
}

impl From<TaskFailure> for TaskResult {
    fn from(failure: TaskFailure) -> Self {
        TaskResult::Failure(failure)
    }
}
