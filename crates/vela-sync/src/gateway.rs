//! # Checkout Gateway
//!
//! The single entry point for finalizing a sale. Decides, per checkout,
//! whether the sale goes straight to the server or into the durable
//! queue. The cashier flow never blocks on connectivity.
//!
//! ## Decision Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      checkout(request)                                  │
//! │                            │                                            │
//! │                       validate sale                                     │
//! │                            │                                            │
//! │               ┌── confirmed state? ──┐                                  │
//! │            Online                 Offline                               │
//! │               │                      │                                  │
//! │        allocate local ID          enqueue ──────► Queued{local_id}     │
//! │               │                                                         │
//! │         direct submit                                                   │
//! │         (ID = idempotency key)                                          │
//! │               │                                                         │
//! │     ┌─────────┼──────────────┐                                          │
//! │  Accepted  Rejected      transient                                      │
//! │     │         │          failure                                        │
//! │     ▼         ▼              │                                          │
//! │ Confirmed  Err(Rejected      ▼                                          │
//! │ {server_id}  ByServer)   enqueue under the SAME ID                      │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                        Queued{local_id}                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The local ID is allocated BEFORE the direct attempt so the queued
//! fallback reuses the key the server may already have seen: a timed-out
//! submission that actually landed deduplicates on the retry instead of
//! charging twice.

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{CheckoutApi, SubmitReply};
use crate::connectivity::MonitorHandle;
use crate::engine::EngineHandle;
use crate::error::{SyncError, SyncResult};
use vela_core::{
    validate_sale_request, ConnectivityState, DrainReport, LocalId, QueuedSale, SaleRequest,
};
use vela_db::Database;

// =============================================================================
// Checkout Outcome
// =============================================================================

/// How a checkout was settled from the cashier's point of view.
///
/// Both variants mean the sale is safe: `Confirmed` on the server,
/// `Queued` durably on this device. A server rejection of an online
/// checkout is an error, not an outcome: nothing was recorded anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The server recorded the sale during checkout.
    Confirmed { server_id: String },

    /// The sale is durably queued and will sync when possible.
    Queued { local_id: LocalId },
}

// =============================================================================
// Checkout Gateway
// =============================================================================

/// Front door for sale finalization, plus the observables a POS screen
/// needs (connectivity, pending count, queue contents).
#[derive(Clone)]
pub struct CheckoutGateway {
    db: Database,
    api: Arc<dyn CheckoutApi>,
    monitor: MonitorHandle,
    engine: EngineHandle,
}

impl CheckoutGateway {
    /// Creates a gateway over shared infrastructure.
    pub fn new(
        db: Database,
        api: Arc<dyn CheckoutApi>,
        monitor: MonitorHandle,
        engine: EngineHandle,
    ) -> Self {
        CheckoutGateway {
            db,
            api,
            monitor,
            engine,
        }
    }

    /// Finalizes a sale.
    ///
    /// Never returns a transport error to the cashier: any transient
    /// failure falls back to the durable queue. The only errors are
    /// local validation, local storage failure, and an explicit server
    /// rejection of an online checkout.
    pub async fn checkout(&self, request: SaleRequest) -> SyncResult<CheckoutOutcome> {
        validate_sale_request(&request)?;

        if self.monitor.state() == ConnectivityState::Offline {
            let local_id = self.db.queue().enqueue(&request).await?;
            info!(local_id = %local_id, "Offline checkout queued");
            return Ok(CheckoutOutcome::Queued { local_id });
        }

        // Reserve the ID first: if the direct attempt times out after
        // reaching the server, the queued fallback must carry the same
        // idempotency key.
        let local_id = self.db.allocator().next_local_id().await?;

        match self.api.submit(&local_id, &request).await {
            Ok(SubmitReply::Accepted { server_id }) => {
                info!(
                    local_id = %local_id,
                    server_id = %server_id,
                    "Checkout confirmed online"
                );
                Ok(CheckoutOutcome::Confirmed { server_id })
            }
            Ok(SubmitReply::Rejected { reason }) => {
                // Nothing recorded anywhere; the cashier must amend the
                // sale and try again.
                warn!(local_id = %local_id, %reason, "Online checkout rejected");
                Err(SyncError::RejectedByServer {
                    local_id: local_id.as_str().to_string(),
                    reason,
                })
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    local_id = %local_id,
                    error = %e,
                    "Direct submission failed, falling back to queue"
                );
                self.db.queue().enqueue_reserved(&local_id, &request).await?;
                Ok(CheckoutOutcome::Queued { local_id })
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Observables
    // =========================================================================

    /// Current confirmed connectivity state.
    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.state()
    }

    /// True if the last confirmed state is Online.
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Watch receiver observing confirmed connectivity transitions, for
    /// an online/offline indicator.
    pub fn subscribe_connectivity(&self) -> tokio::sync::watch::Receiver<ConnectivityState> {
        self.monitor.subscribe()
    }

    /// Resolves a local ID to its server ID once the sale has synced.
    pub fn resolve_local_id(&self, local_id: &LocalId) -> Option<String> {
        self.engine.resolve_local_id(local_id)
    }

    /// Number of sales awaiting synchronization.
    pub async fn pending_count(&self) -> SyncResult<i64> {
        self.engine.pending_count().await
    }

    /// Queue contents in FIFO order.
    pub async fn pending_sales(&self) -> SyncResult<Vec<QueuedSale>> {
        self.engine.pending_sales().await
    }

    /// Forces a drain pass (or joins the one in flight).
    pub async fn manual_sync(&self) -> DrainReport {
        self.engine.manual_sync().await
    }
}
