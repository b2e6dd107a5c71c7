//! Wire payload types for the remote run API

use serde::{Deserialize, Serialize};

use crate::status::RunStatus;

/// Standard `{ success, data, message }` envelope the run API wraps
/// every response in.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Answer from the completion oracle for one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompletionCheckResult {
    pub is_complete: bool,
    pub incomplete_count: u32,
    pub completed_count: u32,
    /// Total units in the run. The wire name is historical.
    #[serde(rename = "total_ingredients")]
    pub total_units: u32,
}

/// Outcome of a remote status transition request.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of the remote status read endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RunStatusPayload {
    pub status: RunStatus,
}
