//! Completion coordinator
//!
//! Coordinates the NEW -> READY transition of runs based on remote
//! completion checks, collapsing trigger bursts through three guards:
//! - **Status guard:** a READY run never re-checks (checked at trigger,
//!   execution, and transition time)
//! - **Debounce gate:** at most one executed check per run per window
//! - **Mutex guard:** at most one oracle call in flight per run

mod config;
mod core;
mod handle;
mod messages;

pub use config::CoordinatorConfig;
pub use core::Coordinator;
pub use handle::CoordinatorHandle;
pub use messages::{CheckOutcome, CompletionNotice, CoordRequest, CoordinatorMetrics};
