//! Shared fixtures for the sync integration tests: a scripted checkout
//! server, a switchable reachability probe, and a fully wired stack over
//! an in-memory database.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use vela_core::{ConnectivityState, LocalId, PaymentMethod, SaleLine, SaleRequest};
use vela_db::{Database, DbConfig};
use vela_sync::{
    CheckoutApi, CheckoutGateway, ConnectivityMonitor, EngineHandle, MonitorHandle,
    ReachabilityProbe, SubmitReply, SyncConfig, SyncEngine, SyncError, SyncResult,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Fixtures
// =============================================================================

/// A valid single-line cash sale.
pub fn sample_sale(total_cents: i64) -> SaleRequest {
    SaleRequest {
        created_at: chrono::Utc::now(),
        items: vec![SaleLine {
            product_id: uuid::Uuid::new_v4().to_string(),
            quantity: 1,
            unit_price_cents: total_cents,
            line_total_cents: total_cents,
        }],
        total_cents,
        user_id: uuid::Uuid::new_v4().to_string(),
        payment_method: PaymentMethod::Cash,
        is_paid: true,
        table_id: None,
    }
}

// =============================================================================
// Scripted Checkout Server
// =============================================================================

/// What the mock server does with the next submission. Once the script
/// runs out, every further submission is accepted.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Accept and assign a server ID (same ID again for a repeated key).
    Accept,
    /// Refuse the sale with this reason.
    Reject(&'static str),
    /// Transient failure; nothing recorded server-side.
    Fail(&'static str),
    /// Record the sale server-side, then lose the response. The caller
    /// sees a timeout; a resubmission under the same key deduplicates.
    AcceptThenTimeout,
    /// Hold the response open before accepting, to keep a drain pass in
    /// flight.
    Delay(Duration),
}

#[derive(Default)]
pub struct MockCheckoutApi {
    script: Mutex<VecDeque<Reply>>,
    /// Idempotency keys of every submission, in arrival order.
    calls: Mutex<Vec<LocalId>>,
    /// Server-side ledger: key -> assigned server ID.
    accepted: Mutex<HashMap<LocalId, String>>,
}

impl MockCheckoutApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn script(&self, replies: impl IntoIterator<Item = Reply>) {
        self.script.lock().await.extend(replies);
    }

    pub async fn calls(&self) -> Vec<LocalId> {
        self.calls.lock().await.clone()
    }

    /// Records the sale in the server ledger, reusing the ID for a
    /// duplicate key.
    async fn record_accept(&self, local_id: &LocalId) -> String {
        self.accepted
            .lock()
            .await
            .entry(local_id.clone())
            .or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone()
    }
}

#[async_trait]
impl CheckoutApi for MockCheckoutApi {
    async fn submit(&self, local_id: &LocalId, _request: &SaleRequest) -> SyncResult<SubmitReply> {
        self.calls.lock().await.push(local_id.clone());

        let reply = self.script.lock().await.pop_front().unwrap_or(Reply::Accept);
        match reply {
            Reply::Accept => Ok(SubmitReply::Accepted {
                server_id: self.record_accept(local_id).await,
            }),
            Reply::Reject(reason) => Ok(SubmitReply::Rejected {
                reason: reason.into(),
            }),
            Reply::Fail(reason) => Err(SyncError::ConnectionFailed(reason.into())),
            Reply::AcceptThenTimeout => {
                self.record_accept(local_id).await;
                Err(SyncError::Timeout)
            }
            Reply::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Ok(SubmitReply::Accepted {
                    server_id: self.record_accept(local_id).await,
                })
            }
        }
    }
}

// =============================================================================
// Switchable Probe
// =============================================================================

pub struct MockProbe {
    reachable: AtomicBool,
}

impl MockProbe {
    pub fn new(reachable: bool) -> Arc<Self> {
        Arc::new(MockProbe {
            reachable: AtomicBool::new(reachable),
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReachabilityProbe for MockProbe {
    async fn check(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Wired Stack
// =============================================================================

/// Fast timings for tests; semantics identical to the defaults except
/// that the startup flush is off, so a test's enqueues and scripts can't
/// race a pass the engine started on its own.
pub fn test_config() -> SyncConfig {
    SyncConfig {
        server_url: "http://localhost:9".into(),
        probe_interval_ms: 20,
        offline_threshold: 2,
        initial_backoff_ms: 10,
        max_backoff_secs: 1,
        drain_on_start: false,
        ..Default::default()
    }
}

pub struct TestStack {
    pub db: Database,
    pub api: Arc<MockCheckoutApi>,
    pub probe: Arc<MockProbe>,
    pub monitor: MonitorHandle,
    pub engine: EngineHandle,
    pub gateway: CheckoutGateway,
}

/// Wires monitor, engine, and gateway over an in-memory database.
pub async fn spawn_stack(reachable: bool) -> TestStack {
    init_tracing();

    let config = test_config();
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let api = MockCheckoutApi::new();
    let probe = MockProbe::new(reachable);

    let (monitor, _monitor_task) =
        ConnectivityMonitor::spawn(probe.clone() as Arc<dyn ReachabilityProbe>, &config);
    let (engine, _engine_task) =
        SyncEngine::spawn(db.queue(), api.clone() as Arc<dyn CheckoutApi>, monitor.clone(), &config);
    let gateway = CheckoutGateway::new(
        db.clone(),
        api.clone() as Arc<dyn CheckoutApi>,
        monitor.clone(),
        engine.clone(),
    );

    TestStack {
        db,
        api,
        probe,
        monitor,
        engine,
        gateway,
    }
}

/// Polls until the confirmed connectivity state matches, panicking after
/// five seconds.
pub async fn wait_for_state(monitor: &MonitorHandle, expected: ConnectivityState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if monitor.state() == expected {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("connectivity never reached {expected}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Polls until the queue is empty, panicking after five seconds.
pub async fn wait_for_empty_queue(engine: &EngineHandle) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if engine.pending_count().await.unwrap() == 0 {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("queue never drained");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
