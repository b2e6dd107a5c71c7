//! Backend adapter error types

use std::time::Duration;
use thiserror::Error;

/// Errors from the remote run API.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The remote rejected the transition because the run is already READY.
    ///
    /// The coordinator treats this as convergent success, not a failure.
    #[error("Run {run_no} is already READY")]
    AlreadyReady { run_no: u32 },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    /// Whether this error means the run was already READY on the remote
    /// side.
    ///
    /// Prefers the structured variant; falls back to message
    /// classification for remotes that only report free text.
    pub fn is_already_ready(&self) -> bool {
        match self {
            BackendError::AlreadyReady { .. } => true,
            BackendError::ApiError { message, .. } => message_indicates_already_ready(message),
            BackendError::InvalidResponse(message) => message_indicates_already_ready(message),
            _ => false,
        }
    }

    /// Whether a retry could plausibly succeed. The coordinator does
    /// not retry on its own; callers like the watch loop use this to
    /// decide whether to keep going.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::ApiError { status, .. } => *status >= 500,
            BackendError::Network(_) => true,
            BackendError::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Classify a free-text remote error as "the run is already READY".
///
/// Some deployments of the run API report the idempotent-conflict case
/// as an error message rather than a structured code; the contract for
/// that message is only that it contains "already" and the terminal
/// status name. Matching is case-insensitive.
pub fn message_indicates_already_ready(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already") && lower.contains("ready")
}
