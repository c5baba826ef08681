//! LLM backend errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to an LLM backend
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    #[error("{}", api_error_message(.message, .status_code))]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    #[error("{}", rate_limit_message(.retry_after))]
    RateLimitError { retry_after: Option<u64> },

    /// Invalid or malformed response from the LLM
    #[error("Invalid response from LLM: {message}")]
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Missing API keys, unknown provider and similar
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// The response could not be parsed into the expected structure
    #[error("Parse error: {message} (context: {context})")]
    ParseError { message: String, context: String },

    #[error("Error: {message}")]
    Other { message: String },
}

fn api_error_message(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("API error ({}): {}", code, message),
        None => format!("API error: {}", message),
    }
}

fn rate_limit_message(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!("Rate limit exceeded, retry after {} seconds", seconds),
        None => "Rate limit exceeded".to_string(),
    }
}

impl BackendError {
    /// Errors that may go away if the same request is sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::TimeoutError { .. }
            | BackendError::RateLimitError { .. }
            | BackendError::NetworkError { .. }
            | BackendError::InvalidResponse { .. }
            | BackendError::ParseError { .. } => true,
            BackendError::ApiError { status_code, .. } => {
                matches!(status_code, None | Some(429) | Some(500..=599))
            }
            BackendError::AuthenticationError { .. }
            | BackendError::ConfigurationError { .. }
            | BackendError::Other { .. } => false,
        }
    }
}
