//! Integration tests for the checkout gateway: routing between direct
//! submission and the durable queue, idempotency-key reuse on fallback,
//! and the observables exposed to the POS screen.

mod support;

use support::{sample_sale, spawn_stack, wait_for_state, Reply};
use vela_core::{ConnectivityState, SyncOutcome};
use vela_sync::{CheckoutOutcome, SyncError};

#[tokio::test]
async fn online_checkout_confirms_directly() {
    let stack = spawn_stack(true).await;

    let outcome = stack.gateway.checkout(sample_sale(1099)).await.unwrap();

    assert!(matches!(outcome, CheckoutOutcome::Confirmed { .. }));
    assert_eq!(stack.gateway.pending_count().await.unwrap(), 0);
    assert_eq!(stack.api.calls().await.len(), 1);
}

#[tokio::test]
async fn offline_checkouts_queue_in_order() {
    let stack = spawn_stack(true).await;

    stack.probe.set_reachable(false);
    wait_for_state(&stack.monitor, ConnectivityState::Offline).await;

    let mut queued = Vec::new();
    for total in [100, 200, 300] {
        match stack.gateway.checkout(sample_sale(total)).await.unwrap() {
            CheckoutOutcome::Queued { local_id } => queued.push(local_id),
            other => panic!("expected Queued, got {other:?}"),
        }
    }

    // Nothing touched the network.
    assert!(stack.api.calls().await.is_empty());
    assert_eq!(stack.gateway.pending_count().await.unwrap(), 3);

    let pending = stack.gateway.pending_sales().await.unwrap();
    let ids: Vec<_> = pending.iter().map(|q| q.local_id.clone()).collect();
    assert_eq!(ids, queued);
}

#[tokio::test]
async fn online_rejection_records_nothing() {
    let stack = spawn_stack(true).await;
    stack.api.script([Reply::Reject("price mismatch")]).await;

    let err = stack.gateway.checkout(sample_sale(100)).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::RejectedByServer { ref reason, .. } if reason == "price mismatch"
    ));
    // Not queued, not confirmed: the cashier amends and retries.
    assert_eq!(stack.gateway.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn transient_direct_failure_falls_back_to_queue() {
    let stack = spawn_stack(true).await;
    stack.api.script([Reply::Fail("connection reset")]).await;

    let outcome = stack.gateway.checkout(sample_sale(100)).await.unwrap();
    let local_id = match outcome {
        CheckoutOutcome::Queued { local_id } => local_id,
        other => panic!("expected Queued, got {other:?}"),
    };

    // The queued entry carries the key the server already saw.
    assert_eq!(stack.api.calls().await, vec![local_id.clone()]);
    let pending = stack.gateway.pending_sales().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].local_id, local_id);
}

#[tokio::test]
async fn ambiguous_timeout_deduplicates_on_drain() {
    let stack = spawn_stack(true).await;

    // The server records the sale but the response is lost.
    stack.api.script([Reply::AcceptThenTimeout]).await;

    let local_id = match stack.gateway.checkout(sample_sale(100)).await.unwrap() {
        CheckoutOutcome::Queued { local_id } => local_id,
        other => panic!("expected Queued, got {other:?}"),
    };

    // The drain resubmits under the same key; the server's dedup answers
    // with the original ID instead of recording a second sale.
    let report = stack.gateway.manual_sync().await;
    assert_eq!(report.synced_count(), 1);
    assert!(matches!(
        &report.outcomes[0],
        SyncOutcome::Synced { local_id: id, .. } if *id == local_id
    ));
    assert_eq!(
        stack.api.calls().await,
        vec![local_id.clone(), local_id.clone()]
    );
    assert_eq!(stack.gateway.pending_count().await.unwrap(), 0);

    // The local ID now resolves to the server's canonical ID.
    let server_id = stack.gateway.resolve_local_id(&local_id).unwrap();
    assert!(matches!(
        &report.outcomes[0],
        SyncOutcome::Synced { server_id: sid, .. } if *sid == server_id
    ));
}

#[tokio::test]
async fn invalid_sale_is_refused_before_any_work() {
    let stack = spawn_stack(true).await;

    let mut sale = sample_sale(100);
    sale.items.clear();

    let err = stack.gateway.checkout(sale).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidSale(_)));

    // No allocation, no network, no queue entry.
    assert!(stack.api.calls().await.is_empty());
    assert_eq!(stack.gateway.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn gateway_exposes_connectivity() {
    let stack = spawn_stack(true).await;
    assert_eq!(stack.gateway.connectivity(), ConnectivityState::Online);

    stack.probe.set_reachable(false);
    wait_for_state(&stack.monitor, ConnectivityState::Offline).await;
    assert_eq!(stack.gateway.connectivity(), ConnectivityState::Offline);
}
