//! RunReady - run completion-check coordinator
//!
//! RunReady coordinates the transition of a work unit ("run") from an
//! in-progress NEW status to the terminal READY status, based on
//! completion checks answered by a remote authority. Many independent
//! events (unit picks, sub-group or segment completions) each ask "is
//! this run finished now?" in quick succession; the coordinator
//! collapses each burst into at most one authoritative check and at
//! most one status transition, applied exactly once even under
//! concurrent duplicate triggers.
//!
//! # Core Concepts
//!
//! - **Triple status guard**: a READY run is never re-checked; the
//!   cache is consulted at trigger, execution, and transition time
//! - **Debounce + coalescing**: within one window only the first
//!   passing trigger executes; near-simultaneous triggers settle
//!   through a short scheduled delay that newer triggers cancel
//! - **Per-run mutex**: one oracle call in flight per run, released on
//!   every outcome including timeouts
//! - **Idempotent convergence**: a remote "already READY" rejection is
//!   reinterpreted as confirmation, not reported as an error
//!
//! # Modules
//!
//! - [`coordinator`] - The coordinator actor, its handle and messages
//! - [`backend`] - Completion oracle / transition executor adapters
//! - [`status`] - Run status types and the local status store
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod backend;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod status;

// Re-export commonly used types
pub use backend::{
    BackendError, CompletionCheckResult, CompletionOracle, HttpBackend, TransitionExecutor, TransitionOutcome,
    message_indicates_already_ready,
};
pub use config::{BackendConfig, Config};
pub use coordinator::{
    CheckOutcome, CompletionNotice, CoordRequest, Coordinator, CoordinatorConfig, CoordinatorHandle,
    CoordinatorMetrics,
};
pub use status::{RunStatus, RunStatusState, StatusStore, StatusTrigger};
