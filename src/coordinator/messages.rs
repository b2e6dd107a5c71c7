//! Message types for the completion coordinator

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::backend::{BackendError, CompletionCheckResult, TransitionOutcome};
use crate::status::{RunStatus, RunStatusState, StatusTrigger};

/// Requests to the coordinator task
#[derive(Debug)]
pub enum CoordRequest {
    /// External trigger asking "is this run finished now?"
    Trigger { run_no: u32, trigger: StatusTrigger },

    /// Seed/overwrite the cached status for a run
    SetStatus { run_no: u32, status: RunStatus },

    /// Read the cached status for a run
    GetStatus {
        run_no: u32,
        reply_tx: oneshot::Sender<Option<RunStatusState>>,
    },

    /// Read the most recently updated cached status
    GetCurrent {
        reply_tx: oneshot::Sender<Option<RunStatusState>>,
    },

    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<CoordinatorMetrics>,
    },

    /// Clear guards, pending timers, and cached statuses
    Reset,

    /// Shutdown the coordinator
    Shutdown,

    /// Coalescing delay elapsed for a scheduled check (internal)
    Execute { run_no: u32, trigger: StatusTrigger },

    /// A spawned oracle call resolved (internal)
    CheckResolved { run_no: u32, outcome: CheckOutcome },

    /// A spawned transition call resolved (internal)
    TransitionResolved {
        run_no: u32,
        result: Result<TransitionOutcome, BackendError>,
    },
}

/// Outcome of one oracle invocation, as seen by the coordinator.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Every unit of the run is finished
    Complete,

    /// The run is still in progress
    Incomplete { completed: u32, total: u32, remaining: u32 },

    /// The oracle call failed or timed out
    Failed(BackendError),
}

impl From<CompletionCheckResult> for CheckOutcome {
    fn from(result: CompletionCheckResult) -> Self {
        if result.is_complete {
            CheckOutcome::Complete
        } else {
            CheckOutcome::Incomplete {
                completed: result.completed_count,
                total: result.total_units,
                remaining: result.incomplete_count,
            }
        }
    }
}

/// Structured completion event emitted on the notice channel when a run
/// reaches READY (or is discovered to already be READY). Delivery to
/// the user is the consumer's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionNotice {
    #[serde(rename = "run-no")]
    pub run_no: u32,
    pub message: String,
}

impl CompletionNotice {
    pub(crate) fn new(run_no: u32, details: &str) -> Self {
        Self {
            run_no,
            message: format!("Run {} is complete: {}. All units have been picked.", run_no, details),
        }
    }
}

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default)]
pub struct CoordinatorMetrics {
    pub triggers_received: u64,
    pub checks_started: u64,
    pub checks_debounced: u64,
    pub duplicates_dropped: u64,
    pub already_ready_skips: u64,
    pub transitions_applied: u64,
    pub reconciled_already_ready: u64,
    pub oracle_failures: u64,
    pub transition_failures: u64,
}
