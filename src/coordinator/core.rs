//! Main completion coordinator task implementation
//!
//! The coordinator collapses bursts of completion triggers into at most
//! one oracle call and at most one NEW -> READY transition per run. All
//! mutable state (status store, per-run guards, metrics) lives inside
//! the actor task; remote calls run in spawned tasks that post their
//! outcome back as messages, so a slow backend never blocks trigger
//! intake and the in-flight guard is released on every outcome.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::backend::{BackendError, CompletionOracle, TransitionExecutor};
use crate::status::{RunStatus, StatusStore};

use super::config::CoordinatorConfig;
use super::handle::CoordinatorHandle;
use super::messages::{CheckOutcome, CompletionNotice, CoordRequest, CoordinatorMetrics};

/// Guard state for one run: debounce timestamp, pending coalescing
/// task, and the in-flight flag.
///
/// Keyed per run so a check in flight for one run never causes triggers
/// for an unrelated run to be dropped.
#[derive(Default)]
struct RunGuard {
    check_in_flight: bool,
    last_check_started: Option<Instant>,
    pending: Option<JoinHandle<()>>,
}

impl RunGuard {
    /// Abort a scheduled, not-yet-executing check. A check already in
    /// flight is unaffected.
    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// The completion coordinator actor.
pub struct Coordinator {
    config: CoordinatorConfig,
    tx: mpsc::Sender<CoordRequest>,
    rx: mpsc::Receiver<CoordRequest>,
    notice_tx: mpsc::Sender<CompletionNotice>,
    oracle: Arc<dyn CompletionOracle>,
    executor: Arc<dyn TransitionExecutor>,
}

impl Coordinator {
    /// Create a new coordinator with the given configuration and
    /// remote adapters. Returns the coordinator and the receiving end
    /// of the completion notice channel.
    pub fn new(
        config: CoordinatorConfig,
        oracle: Arc<dyn CompletionOracle>,
        executor: Arc<dyn TransitionExecutor>,
    ) -> (Self, mpsc::Receiver<CompletionNotice>) {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        let (notice_tx, notice_rx) = mpsc::channel(config.notice_buffer);
        (
            Self {
                config,
                tx,
                rx,
                notice_tx,
                oracle,
                executor,
            },
            notice_rx,
        )
    }

    /// Create a handle for interacting with this coordinator.
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(self.tx.clone())
    }

    /// Run the coordinator task.
    ///
    /// This consumes the coordinator and runs until shutdown is
    /// requested or all handles are dropped.
    pub async fn run(mut self) {
        let coord_tx = self.tx.clone();
        let notice_tx = self.notice_tx.clone();
        let oracle = Arc::clone(&self.oracle);
        let executor = Arc::clone(&self.executor);

        // Actor-owned state
        let mut store = StatusStore::new();
        let mut guards: HashMap<u32, RunGuard> = HashMap::new();
        let mut metrics = CoordinatorMetrics::default();

        info!("Completion coordinator started");

        while let Some(req) = self.rx.recv().await {
            match req {
                CoordRequest::Trigger { run_no, trigger } => {
                    metrics.triggers_received += 1;
                    debug!(run_no, %trigger, "Completion check triggered");

                    let guard = guards.entry(run_no).or_default();

                    // Status guard: a READY run never re-checks
                    if store.is_ready(run_no) {
                        debug!(run_no, "Run already READY, skipping completion check");
                        metrics.already_ready_skips += 1;
                        guard.cancel_pending();
                        continue;
                    }

                    // A newer trigger supersedes a pending scheduled check
                    guard.cancel_pending();

                    // Debounce: within the window, only the check started
                    // by the first passing trigger runs
                    if let Some(started) = guard.last_check_started
                        && started.elapsed() < self.config.debounce_window()
                    {
                        debug!(run_no, %trigger, "Within debounce window, dropping trigger");
                        metrics.checks_debounced += 1;
                        continue;
                    }

                    // Let near-simultaneous triggers settle before executing
                    let delay = self.config.coalesce_delay();
                    let tx = coord_tx.clone();
                    guard.pending = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(CoordRequest::Execute { run_no, trigger }).await;
                    }));
                }

                CoordRequest::Execute { run_no, trigger } => {
                    let guard = guards.entry(run_no).or_default();
                    guard.pending = None;

                    // Re-check the status guard at execution time
                    if store.is_ready(run_no) {
                        debug!(run_no, "Run became READY before execution, aborting check");
                        metrics.already_ready_skips += 1;
                        continue;
                    }

                    // A scheduled check can lose the race with a newer
                    // trigger and arrive stale, after that trigger has
                    // already started a check; apply the debounce test
                    // again at execution time
                    if let Some(started) = guard.last_check_started
                        && started.elapsed() < self.config.debounce_window()
                    {
                        debug!(run_no, %trigger, "Stale scheduled check inside debounce window, dropping");
                        metrics.checks_debounced += 1;
                        continue;
                    }

                    // Mutex guard: one oracle call in flight per run
                    if guard.check_in_flight {
                        debug!(run_no, "Completion check already in flight, dropping duplicate");
                        metrics.duplicates_dropped += 1;
                        continue;
                    }

                    guard.check_in_flight = true;
                    guard.last_check_started = Some(Instant::now());
                    metrics.checks_started += 1;
                    info!(run_no, %trigger, "Executing completion check");

                    let oracle = Arc::clone(&oracle);
                    let timeout = self.config.check_timeout();
                    let tx = coord_tx.clone();
                    tokio::spawn(async move {
                        let outcome = match tokio::time::timeout(timeout, oracle.check_completion(run_no)).await {
                            Ok(Ok(result)) => CheckOutcome::from(result),
                            Ok(Err(e)) => CheckOutcome::Failed(e),
                            Err(_) => CheckOutcome::Failed(BackendError::Timeout(timeout)),
                        };
                        let _ = tx.send(CoordRequest::CheckResolved { run_no, outcome }).await;
                    });
                }

                CoordRequest::CheckResolved { run_no, outcome } => {
                    // Release the in-flight flag before anything else;
                    // every oracle outcome lands here, including timeouts.
                    if let Some(guard) = guards.get_mut(&run_no) {
                        guard.check_in_flight = false;
                    }

                    match outcome {
                        CheckOutcome::Incomplete {
                            completed,
                            total,
                            remaining,
                        } => {
                            info!(run_no, completed, total, remaining, "Run still in progress");
                        }
                        CheckOutcome::Failed(e) => {
                            // No retry is scheduled; the next external
                            // trigger will attempt again.
                            error!(run_no, error = %e, "Completion check failed");
                            metrics.oracle_failures += 1;
                        }
                        CheckOutcome::Complete => {
                            // Final status guard before the remote call
                            if store.is_ready(run_no) {
                                debug!(run_no, "Run already READY, skipping duplicate transition");
                                metrics.already_ready_skips += 1;
                                let notice = CompletionNotice::new(run_no, "status is already READY");
                                let _ = notice_tx.send(notice).await;
                                continue;
                            }

                            info!(run_no, "All units finished, updating status to READY");
                            let executor = Arc::clone(&executor);
                            let timeout = self.config.check_timeout();
                            let tx = coord_tx.clone();
                            tokio::spawn(async move {
                                let result = match tokio::time::timeout(timeout, executor.set_ready(run_no)).await {
                                    Ok(result) => result,
                                    Err(_) => Err(BackendError::Timeout(timeout)),
                                };
                                let _ = tx.send(CoordRequest::TransitionResolved { run_no, result }).await;
                            });
                        }
                    }
                }

                CoordRequest::TransitionResolved { run_no, result } => match result {
                    Ok(outcome) => {
                        info!(run_no, "Run status changed from NEW to READY");
                        store.set(run_no, RunStatus::Ready);
                        metrics.transitions_applied += 1;

                        let details = outcome.message.as_deref().unwrap_or("status updated to READY");
                        let _ = notice_tx.send(CompletionNotice::new(run_no, details)).await;
                    }
                    Err(e) if e.is_already_ready() => {
                        // Another path won the race to apply the same
                        // transition; converge instead of reporting an error.
                        info!(run_no, "Remote reports run already READY, treating as success");
                        store.set(run_no, RunStatus::Ready);
                        metrics.reconciled_already_ready += 1;

                        let notice = CompletionNotice::new(run_no, "status was already READY");
                        let _ = notice_tx.send(notice).await;
                    }
                    Err(e) => {
                        error!(run_no, error = %e, "Status transition failed");
                        metrics.transition_failures += 1;
                    }
                },

                CoordRequest::SetStatus { run_no, status } => {
                    debug!(run_no, %status, "Seeding cached status");
                    store.set(run_no, status);
                }

                CoordRequest::GetStatus { run_no, reply_tx } => {
                    let _ = reply_tx.send(store.get(run_no).cloned());
                }

                CoordRequest::GetCurrent { reply_tx } => {
                    let _ = reply_tx.send(store.current().cloned());
                }

                CoordRequest::GetMetrics { reply_tx } => {
                    let _ = reply_tx.send(metrics.clone());
                }

                CoordRequest::Reset => {
                    debug!("Resetting coordinator state");
                    for guard in guards.values_mut() {
                        guard.cancel_pending();
                    }
                    guards.clear();
                    store.clear();
                    metrics = CoordinatorMetrics::default();
                }

                CoordRequest::Shutdown => {
                    info!("Completion coordinator shutting down");
                    break;
                }
            }
        }

        for guard in guards.values_mut() {
            guard.cancel_pending();
        }

        info!("Completion coordinator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CompletionCheckResult, TransitionOutcome};
    use crate::status::StatusTrigger;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticBackend {
        complete: bool,
        check_calls: AtomicUsize,
        transition_calls: AtomicUsize,
    }

    impl StaticBackend {
        fn new(complete: bool) -> Arc<Self> {
            Arc::new(Self {
                complete,
                check_calls: AtomicUsize::new(0),
                transition_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionOracle for StaticBackend {
        async fn check_completion(&self, _run_no: u32) -> Result<CompletionCheckResult, BackendError> {
            self.check_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompletionCheckResult {
                is_complete: self.complete,
                incomplete_count: if self.complete { 0 } else { 2 },
                completed_count: if self.complete { 5 } else { 3 },
                total_units: 5,
            })
        }
    }

    #[async_trait]
    impl TransitionExecutor for StaticBackend {
        async fn set_ready(&self, _run_no: u32) -> Result<TransitionOutcome, BackendError> {
            self.transition_calls.fetch_add(1, Ordering::SeqCst);
            Ok(TransitionOutcome {
                success: true,
                message: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_on_ready_run_never_calls_oracle() {
        let backend = StaticBackend::new(true);
        let (coord, _notice_rx) =
            Coordinator::new(CoordinatorConfig::default(), backend.clone(), backend.clone());
        let handle = coord.handle();
        let task = tokio::spawn(coord.run());

        handle.set_status(503, RunStatus::Ready).await.unwrap();
        handle.trigger_check(503, StatusTrigger::ManualCheck).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(backend.check_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.transition_calls.load(Ordering::SeqCst), 0);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_store_and_cancels_pending() {
        let backend = StaticBackend::new(false);
        let (coord, _notice_rx) =
            Coordinator::new(CoordinatorConfig::default(), backend.clone(), backend.clone());
        let handle = coord.handle();
        let task = tokio::spawn(coord.run());

        handle.set_status(500, RunStatus::New).await.unwrap();
        handle.trigger_check(500, StatusTrigger::AfterUnitPick).await.unwrap();
        // Reset lands before the coalescing delay elapses
        handle.reset().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(backend.check_calls.load(Ordering::SeqCst), 0);
        assert!(handle.status(500).await.unwrap().is_none());

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_scheduled_check_is_debounced() {
        let backend = StaticBackend::new(false);
        let (coord, _notice_rx) =
            Coordinator::new(CoordinatorConfig::default(), backend.clone(), backend.clone());
        let handle = coord.handle();
        let tx = coord.tx.clone();
        let task = tokio::spawn(coord.run());

        handle.set_status(500, RunStatus::New).await.unwrap();
        handle.trigger_check(500, StatusTrigger::AfterUnitPick).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // A coalescing task that lost the channel race with a newer
        // trigger delivers its message after the first check has
        // already started and resolved
        tx.send(CoordRequest::Execute {
            run_no: 500,
            trigger: StatusTrigger::AfterUnitPick,
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(backend.check_calls.load(Ordering::SeqCst), 1);
        let metrics = handle.metrics().await.unwrap();
        assert_eq!(metrics.checks_started, 1);
        assert_eq!(metrics.checks_debounced, 1);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_explicit() {
        let backend = StaticBackend::new(false);
        let (coord, _notice_rx) =
            Coordinator::new(CoordinatorConfig::default(), backend.clone(), backend.clone());
        let handle = coord.handle();
        let task = tokio::spawn(coord.run());

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("coordinator should stop after shutdown")
            .unwrap();

        // Requests after shutdown fail cleanly
        assert!(handle.trigger_check(500, StatusTrigger::ManualCheck).await.is_err());
    }
}
