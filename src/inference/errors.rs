//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. None of them cross
//! the pipeline boundary as-is: [`super::pipeline`] folds them into the
//! `(success, message)` shape the controller renders.

use thiserror::Error;

/// Errors that can occur while talking to the completion endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The endpoint did not respond within the transport timeout.
    #[error("request timed out after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx HTTP response from the endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body was not a usable chat completion.
    #[error("invalid completion response: {reason}")]
    ResponseError { reason: String },

    /// The system prompt template could not be loaded.
    #[error("prompt template '{name}': {reason}")]
    PromptError { name: String, reason: String },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}

impl InferenceError {
    /// Whether the remote side rejected the credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, InferenceError::HttpError { status: 401 | 403, .. })
    }
}
