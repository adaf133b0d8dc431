//! Integration tests for the connectivity monitor: hysteresis against a
//! switchable probe, and transition notification through the watch
//! channel.

mod support;

use std::time::Duration;
use support::{spawn_stack, wait_for_state, MockProbe};
use vela_core::ConnectivityState;
use vela_sync::{ConnectivityMonitor, ReachabilityProbe};

#[tokio::test]
async fn starts_online_and_stays_online_while_reachable() {
    let stack = spawn_stack(true).await;

    assert_eq!(stack.monitor.state(), ConnectivityState::Online);

    // Several probe cycles later, still online and no spurious
    // transitions published.
    let mut rx = stack.monitor.subscribe();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(stack.monitor.state(), ConnectivityState::Online);
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn flips_offline_after_consecutive_failures_and_back_on_success() {
    let stack = spawn_stack(true).await;

    stack.probe.set_reachable(false);
    wait_for_state(&stack.monitor, ConnectivityState::Offline).await;

    stack.probe.set_reachable(true);
    wait_for_state(&stack.monitor, ConnectivityState::Online).await;
}

#[tokio::test]
async fn watch_subscribers_observe_transitions() {
    let stack = spawn_stack(true).await;
    let mut rx = stack.monitor.subscribe();

    stack.probe.set_reachable(false);
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("offline transition published")
        .unwrap();
    assert_eq!(*rx.borrow_and_update(), ConnectivityState::Offline);

    stack.probe.set_reachable(true);
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("online transition published")
        .unwrap();
    assert_eq!(*rx.borrow_and_update(), ConnectivityState::Online);
}

#[tokio::test]
async fn shutdown_stops_probing() {
    support::init_tracing();
    let probe = MockProbe::new(true);
    let config = support::test_config();

    let (handle, task) =
        ConnectivityMonitor::spawn(probe.clone() as std::sync::Arc<dyn ReachabilityProbe>, &config);

    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("monitor task exits after shutdown")
        .unwrap();
}
