use crate::llm::BackendError;
use crate::pipeline::{FailureKind, TaskFailure};
use thiserror::Error;

/// Error returned by every collaborator
///
/// Carries the pipeline's failure classification so tasks can hand it to the
/// orchestrator unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SourceError {
    pub kind: FailureKind,
    pub message: String,
    pub recoverable: bool,
}

impl SourceError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: kind.default_recoverable(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(FailureKind::AccessDenied, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TransientError, message)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(FailureKind::QuotaExceeded, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, message)
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::new(FailureKind::BuildError, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ConfigurationError, message)
    }

    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    /// Generic HTTP status mapping shared by the API clients
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 | 410 => Self::not_found(message),
            401 | 403 => Self::access_denied(message),
            429 => Self::rate_limited(message),
            408 | 500..=599 => Self::transient(message),
            _ => Self::new(FailureKind::ConfigurationError, message).with_recoverable(false),
        }
    }
}

impl From<SourceError> for TaskFailure {
    fn from(err: SourceError) -> Self {
        TaskFailure {
            kind: err.kind,
            message: err.message,
            recoverable: err.recoverable,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return SourceError::from_status(status.as_u16(), err.to_string());
        }
        // Timeouts, connection failures and truncated or malformed bodies
        // are all treated as transient network conditions.
        SourceError::transient(err.to_string())
    }
}

impl From<BackendError> for SourceError {
    fn from(err: BackendError) -> Self {
        let message = err.to_string();
        match err {
            BackendError::RateLimitError { .. } => SourceError::rate_limited(message),
            BackendError::AuthenticationError { .. } => SourceError::access_denied(message),
            BackendError::ConfigurationError { .. } => SourceError::configuration(message),
            ref other if other.is_retryable() => SourceError::transient(message),
            _ => SourceError::transient(message).with_recoverable(false),
        }
    }
}
