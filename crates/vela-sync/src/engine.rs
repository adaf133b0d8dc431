//! # Sync Engine
//!
//! Drains the durable sale queue toward the server, one sale at a time,
//! in FIFO order, with exponential backoff between failed passes.
//!
//! ## Drain Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Drain Pass                                      │
//! │                                                                         │
//! │   trigger (reconnect │ manual │ retry timer)                            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌─────────────┐ empty ┌───────────┐                                  │
//! │   │ peek oldest │ ────► │ Completed │──► reset backoff                 │
//! │   └──────┬──────┘       └───────────┘                                  │
//! │          │ entry                                                        │
//! │          ▼                                                              │
//! │   ┌─────────────┐  Accepted / Rejected   ┌────────────┐               │
//! │   │   submit    │ ─────────────────────► │   remove   │──► next entry │
//! │   └──────┬──────┘                        └────────────┘               │
//! │          │ transient failure                                           │
//! │          ▼                                                             │
//! │   ┌──────────────────┐      ┌──────────────────┐                      │
//! │   │  record attempt  │ ───► │ StoppedRetryable │──► backoff, retry    │
//! │   └──────────────────┘      └──────────────────┘                      │
//! │                                                                        │
//! │  COALESCING: at most one pass runs at a time. A trigger arriving       │
//! │  mid-pass joins the running pass and receives its report.              │
//! │                                                                        │
//! │  ORDERING: a transient failure stops the whole pass; the sale          │
//! │  behind a failing one is never submitted ahead of it.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{CheckoutApi, SubmitReply};
use crate::config::SyncConfig;
use crate::connectivity::MonitorHandle;
use crate::error::{SyncError, SyncResult};
use vela_core::{
    ConnectivityState, DrainDisposition, DrainReport, LocalId, QueuedSale, SyncOutcome,
};
use vela_db::SaleQueueRepository;

/// A drain pass in flight, joinable by any number of triggers.
type SharedDrain = Shared<BoxFuture<'static, DrainReport>>;

// =============================================================================
// Engine Handle
// =============================================================================

/// Handle for interacting with the sync engine from other components.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<EngineInner>,
    monitor: MonitorHandle,
    shutdown_tx: mpsc::Sender<()>,
}

impl EngineHandle {
    /// Runs (or joins) a drain pass and returns its report.
    ///
    /// While offline this returns an empty report without touching the
    /// network; the queue drains when connectivity returns.
    pub async fn manual_sync(&self) -> DrainReport {
        if !self.monitor.is_online() {
            debug!("Manual sync requested while offline, nothing attempted");
            return DrainReport::empty();
        }
        self.inner.trigger_drain().await.await
    }

    /// Number of sales awaiting synchronization.
    pub async fn pending_count(&self) -> SyncResult<i64> {
        Ok(self.inner.queue.count().await?)
    }

    /// Snapshot of the queue in FIFO order.
    pub async fn pending_sales(&self) -> SyncResult<Vec<QueuedSale>> {
        Ok(self.inner.queue.snapshot().await?)
    }

    /// Looks up the server ID a local ID synced under during this
    /// process's lifetime. Serves UIs still holding a local ID after the
    /// queue drained behind them.
    pub fn resolve_local_id(&self, local_id: &LocalId) -> Option<String> {
        self.inner
            .resolved
            .lock()
            .ok()
            .and_then(|map| map.get(local_id).cloned())
    }

    /// Triggers graceful shutdown: the run loop exits and any in-flight
    /// pass stops at the next entry boundary.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.inner.stopping.store(true, Ordering::SeqCst);
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Engine already stopped".into()))
    }
}

// =============================================================================
// Engine Internals
// =============================================================================

struct EngineInner {
    queue: SaleQueueRepository,
    api: Arc<dyn CheckoutApi>,
    stuck_threshold: i64,
    stopping: AtomicBool,
    /// Slot holding the current (or most recent) drain pass. Guarded so
    /// that exactly one fresh pass can be started at a time.
    drain_slot: Mutex<Option<SharedDrain>>,
    /// local ID -> server ID for sales synced during this process's
    /// lifetime. In-memory only; the mapping is reconstructible
    /// server-side from the idempotency keys.
    resolved: std::sync::Mutex<HashMap<LocalId, String>>,
}

impl EngineInner {
    /// Returns a joinable future for the active drain pass, starting a
    /// fresh pass if none is running.
    async fn trigger_drain(self: &Arc<Self>) -> SharedDrain {
        let mut slot = self.drain_slot.lock().await;

        if let Some(active) = slot.as_ref() {
            // peek() is Some once the shared future has resolved.
            if active.peek().is_none() {
                debug!("Joining drain pass already in flight");
                return active.clone();
            }
        }

        let inner = self.clone();
        let pass: SharedDrain = async move {
            // The pass runs in its own task so it completes even if every
            // joined caller is dropped mid-drain.
            match tokio::spawn(async move { inner.drain_pass().await }).await {
                Ok(report) => report,
                Err(e) => {
                    error!(error = %e, "Drain pass task panicked");
                    DrainReport::aborted()
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(pass.clone());
        pass
    }

    /// One full drain pass over the queue, oldest first.
    async fn drain_pass(&self) -> DrainReport {
        debug!("Drain pass starting");
        let mut report = DrainReport::empty();

        loop {
            if self.stopping.load(Ordering::SeqCst) {
                info!("Drain pass stopping for shutdown");
                report.disposition = DrainDisposition::Aborted;
                return report;
            }

            let entry = match self.queue.peek_oldest().await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    debug!(synced = report.synced_count(), "Drain pass completed");
                    report.disposition = DrainDisposition::Completed;
                    return report;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read queue head, aborting pass");
                    report.disposition = DrainDisposition::Aborted;
                    return report;
                }
            };

            match self.drain_one(&entry).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(stop) => {
                    match stop {
                        PassStop::Retryable(outcome) => {
                            if entry.attempts + 1 >= self.stuck_threshold {
                                warn!(
                                    local_id = %entry.local_id,
                                    attempts = entry.attempts + 1,
                                    "Queued sale needs operator attention"
                                );
                                report.stuck.push(entry.local_id.clone());
                            }
                            report.outcomes.push(outcome);
                            report.disposition = DrainDisposition::StoppedRetryable;
                        }
                        PassStop::Aborted => {
                            report.disposition = DrainDisposition::Aborted;
                        }
                    }
                    return report;
                }
            }
        }
    }

    /// Submits the queue head and settles it. `Ok` means the pass moves
    /// on to the next entry; `Err` means the pass stops here.
    async fn drain_one(&self, entry: &QueuedSale) -> Result<SyncOutcome, PassStop> {
        match self.api.submit(&entry.local_id, &entry.request).await {
            Ok(SubmitReply::Accepted { server_id }) => {
                info!(
                    local_id = %entry.local_id,
                    server_id = %server_id,
                    "Sale synced"
                );
                self.settle(entry).await?;
                if let Ok(mut map) = self.resolved.lock() {
                    map.insert(entry.local_id.clone(), server_id.clone());
                }
                Ok(SyncOutcome::Synced {
                    local_id: entry.local_id.clone(),
                    server_id,
                })
            }
            Ok(SubmitReply::Rejected { reason }) => {
                // Terminal verdict: the entry leaves the queue so the
                // sales behind it are not starved by a doomed retry.
                warn!(
                    local_id = %entry.local_id,
                    %reason,
                    "Sale rejected by server, removing from queue"
                );
                self.settle(entry).await?;
                Ok(SyncOutcome::Rejected {
                    local_id: entry.local_id.clone(),
                    reason,
                })
            }
            Err(e) => {
                debug!(local_id = %entry.local_id, error = %e, "Submission failed");
                if let Err(db_err) = self.queue.record_attempt(&entry.local_id, &e.to_string()).await
                {
                    // Bookkeeping only; the entry is still queued and the
                    // pass stops either way.
                    warn!(
                        local_id = %entry.local_id,
                        error = %db_err,
                        "Failed to record attempt"
                    );
                }
                Err(PassStop::Retryable(SyncOutcome::Retryable {
                    local_id: entry.local_id.clone(),
                    reason: e.to_string(),
                }))
            }
        }
    }

    /// Removes a terminally-settled entry. A removal failure aborts the
    /// pass: continuing would re-submit the same entry forever.
    async fn settle(&self, entry: &QueuedSale) -> Result<(), PassStop> {
        self.queue.remove(&entry.local_id).await.map_err(|e| {
            error!(
                local_id = %entry.local_id,
                error = %e,
                "Failed to remove settled entry, aborting pass"
            );
            PassStop::Aborted
        })
    }
}

/// Why a drain pass stopped before the queue was empty.
enum PassStop {
    Retryable(SyncOutcome),
    Aborted,
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Background engine that drains the queue on reconnect and retries
/// failed passes with exponential backoff.
///
/// ## Usage
/// ```rust,ignore
/// let engine = SyncEngine::spawn(db.queue(), api, monitor.clone(), &config);
///
/// // From the UI: force a pass and inspect the result.
/// let report = engine.manual_sync().await;
/// println!("synced {} sales", report.synced_count());
/// ```
pub struct SyncEngine;

impl SyncEngine {
    /// Spawns the engine's run loop and returns its handle.
    pub fn spawn(
        queue: SaleQueueRepository,
        api: Arc<dyn CheckoutApi>,
        monitor: MonitorHandle,
        config: &SyncConfig,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let inner = Arc::new(EngineInner {
            queue,
            api,
            stuck_threshold: config.stuck_threshold,
            stopping: AtomicBool::new(false),
            drain_slot: Mutex::new(None),
            resolved: std::sync::Mutex::new(HashMap::new()),
        });

        let handle = EngineHandle {
            inner: inner.clone(),
            monitor: monitor.clone(),
            shutdown_tx,
        };

        let backoff = ExponentialBackoff {
            initial_interval: config.initial_backoff(),
            max_interval: config.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let task = tokio::spawn(Self::run(
            inner,
            monitor,
            backoff,
            config.drain_on_start,
            shutdown_rx,
        ));

        (handle, task)
    }

    /// Main loop: optionally flush leftovers on start, then drain on
    /// every confirmed reconnect.
    async fn run(
        inner: Arc<EngineInner>,
        monitor: MonitorHandle,
        mut backoff: ExponentialBackoff,
        drain_on_start: bool,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        info!("Sync engine starting");

        let mut state_rx = monitor.subscribe();

        // Flush leftovers from a previous run.
        if drain_on_start && *state_rx.borrow() == ConnectivityState::Online {
            match inner.queue.count().await {
                Ok(0) => {}
                Ok(pending) => {
                    info!(pending, "Draining sales queued before startup");
                    Self::drain_until_settled(&inner, &mut state_rx, &mut backoff, &mut shutdown_rx)
                        .await;
                }
                Err(e) => error!(error = %e, "Failed to count queue at startup"),
            }
        }

        loop {
            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        warn!("Connectivity monitor gone, stopping engine");
                        break;
                    }
                    let state = *state_rx.borrow_and_update();
                    info!(%state, "Connectivity transition");
                    if state == ConnectivityState::Online {
                        backoff.reset();
                        Self::drain_until_settled(
                            &inner,
                            &mut state_rx,
                            &mut backoff,
                            &mut shutdown_rx,
                        )
                        .await;
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Sync engine received shutdown signal");
                    break;
                }
            }
        }

        inner.stopping.store(true, Ordering::SeqCst);
        info!("Sync engine stopped");
    }

    /// Runs drain passes, sleeping the backoff between retryable stops,
    /// until the queue empties, connectivity drops, or shutdown.
    async fn drain_until_settled(
        inner: &Arc<EngineInner>,
        state_rx: &mut tokio::sync::watch::Receiver<ConnectivityState>,
        backoff: &mut ExponentialBackoff,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) {
        loop {
            let report = inner.trigger_drain().await.await;

            match report.disposition {
                DrainDisposition::Completed => {
                    backoff.reset();
                    return;
                }
                DrainDisposition::Aborted => return,
                DrainDisposition::StoppedRetryable => {
                    // Fall through to the backoff sleep.
                }
            }

            if *state_rx.borrow() == ConnectivityState::Offline {
                // The monitor will re-trigger draining on reconnect.
                return;
            }

            // ExponentialBackoff without max_elapsed_time never returns
            // None, but don't spin if it somehow does.
            let delay = backoff
                .next_backoff()
                .unwrap_or_else(|| backoff.max_interval);
            debug!(?delay, "Waiting before retrying drain");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = state_rx.changed() => {
                    if changed.is_err()
                        || *state_rx.borrow_and_update() == ConnectivityState::Offline
                    {
                        return;
                    }
                    // Back online mid-wait: retry immediately.
                    backoff.reset();
                }
                _ = shutdown_rx.recv() => {
                    inner.stopping.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    }
}
