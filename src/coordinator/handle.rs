//! CoordinatorHandle - client interface to the completion coordinator
//!
//! The handle is cloneable and cheap; every operation is a message to
//! the coordinator task. Trigger intake is fire-and-forget: a trigger
//! that gets debounced or dropped as a duplicate still returns Ok.

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::status::{RunStatus, RunStatusState, StatusTrigger};

use super::messages::{CoordRequest, CoordinatorMetrics};

/// Handle for interacting with the completion coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordRequest>,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest>) -> Self {
        Self { tx }
    }

    /// Request a completion check for a run.
    ///
    /// Fire-and-forget and idempotent under duplicates: the
    /// coordinator's guards decide whether a check actually runs. An
    /// error only means the coordinator is gone.
    pub async fn trigger_check(&self, run_no: u32, trigger: StatusTrigger) -> Result<()> {
        debug!(run_no, %trigger, "CoordinatorHandle::trigger_check: called");
        self.tx
            .send(CoordRequest::Trigger { run_no, trigger })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        Ok(())
    }

    /// Seed or overwrite the cached status for a run.
    ///
    /// Used when the caller already has fresh status from elsewhere.
    pub async fn set_status(&self, run_no: u32, status: RunStatus) -> Result<()> {
        debug!(run_no, %status, "CoordinatorHandle::set_status: called");
        self.tx
            .send(CoordRequest::SetStatus { run_no, status })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        Ok(())
    }

    /// Read the cached status for a run.
    pub async fn status(&self, run_no: u32) -> Result<Option<RunStatusState>> {
        debug!(run_no, "CoordinatorHandle::status: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::GetStatus { run_no, reply_tx })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        reply_rx.await.map_err(|_| eyre!("Coordinator shutdown before reply"))
    }

    /// Read the most recently updated cached status.
    pub async fn current_status(&self) -> Result<Option<RunStatusState>> {
        debug!("CoordinatorHandle::current_status: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::GetCurrent { reply_tx })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        reply_rx.await.map_err(|_| eyre!("Coordinator shutdown before reply"))
    }

    /// Get current coordinator metrics.
    pub async fn metrics(&self) -> Result<CoordinatorMetrics> {
        debug!("CoordinatorHandle::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        reply_rx.await.map_err(|_| eyre!("Coordinator shutdown before reply"))
    }

    /// Clear guard state, pending timers, and cached statuses.
    ///
    /// Intended for test isolation and component teardown.
    pub async fn reset(&self) -> Result<()> {
        debug!("CoordinatorHandle::reset: called");
        self.tx
            .send(CoordRequest::Reset)
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        Ok(())
    }

    /// Request shutdown of the coordinator task.
    pub async fn shutdown(&self) -> Result<()> {
        debug!("CoordinatorHandle::shutdown: called");
        self.tx
            .send(CoordRequest::Shutdown)
            .await
            .map_err(|_| eyre!("Coordinator channel closed"))?;

        Ok(())
    }
}
