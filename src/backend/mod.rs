//! Remote collaborator adapters
//!
//! The coordinator consumes two remote interfaces: the completion
//! oracle ("is every unit of run R finished?") and the transition
//! executor (apply the NEW -> READY change). [`HttpBackend`] implements
//! both against the run API; tests substitute their own
//! implementations.

use async_trait::async_trait;

mod error;
mod http;
mod types;

pub use error::{BackendError, message_indicates_already_ready};
pub use http::HttpBackend;
pub use types::{ApiEnvelope, CompletionCheckResult, RunStatusPayload, TransitionOutcome};

/// Remote authority that decides whether a run is complete.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Ask whether every unit of the run is finished.
    async fn check_completion(&self, run_no: u32) -> Result<CompletionCheckResult, BackendError>;
}

/// Remote authority that applies the NEW -> READY status change.
#[async_trait]
pub trait TransitionExecutor: Send + Sync {
    /// Request the terminal status change for a run.
    ///
    /// Implementations should map a remote "already READY" rejection to
    /// [`BackendError::AlreadyReady`] where they can recognize it.
    async fn set_ready(&self, run_no: u32) -> Result<TransitionOutcome, BackendError>;
}
