//! # Connectivity Monitor
//!
//! Periodic reachability probing with hysteresis, published through a
//! watch channel.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Connectivity Hysteresis                             │
//! │                                                                         │
//! │                 probe failure (count < threshold)                       │
//! │                      ┌──────────┐                                       │
//! │                      ▼          │                                       │
//! │                ┌────────────────┴──┐                                    │
//! │      ┌───────► │      Online       │ ◄──────┐                          │
//! │      │         └─────────┬─────────┘        │                          │
//! │      │                   │                  │                           │
//! │      │    threshold consecutive failures    │  single success           │
//! │      │                   │                  │                           │
//! │      │                   ▼                  │                           │
//! │      │         ┌───────────────────┐        │                          │
//! │      │         │      Offline      │ ───────┘                          │
//! │      │         └───────────────────┘                                    │
//! │      │                                                                  │
//! │  (initial state: Online, so the first checkout tries the                │
//! │   server before the first probe result arrives)                         │
//! │                                                                         │
//! │  Asymmetry: flipping Offline needs N consecutive failures so a          │
//! │  single dropped probe doesn't reroute checkouts through the queue;      │
//! │  flipping Online needs one success so draining starts promptly.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Subscribers only see confirmed transitions: the watch channel is
//! written exactly when the state changes, never on repeat probe results.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use vela_core::ConnectivityState;

// =============================================================================
// Reachability Probe
// =============================================================================

/// A single reachability check against the server.
///
/// Abstracted behind a trait so tests can script reachability without a
/// network.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns true if the server answered within the probe timeout.
    async fn check(&self) -> bool;
}

/// HTTP reachability probe: a bounded HEAD request against the server's
/// health endpoint.
///
/// Any 2xx within the timeout counts as reachable. Anything else, be it
/// an error status, a transport failure, or a timeout, counts as a
/// failed probe.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Creates a probe against the config's health endpoint.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .build()
            .map_err(|e| SyncError::Internal(e.to_string()))?;

        Ok(HttpProbe {
            client,
            url: config.probe_url(),
        })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn check(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Reachability probe failed");
                false
            }
        }
    }
}

// =============================================================================
// Monitor Handle
// =============================================================================

/// Handle for querying and subscribing to connectivity state.
#[derive(Clone)]
pub struct MonitorHandle {
    state_rx: watch::Receiver<ConnectivityState>,
    shutdown_tx: mpsc::Sender<()>,
}

impl MonitorHandle {
    /// Returns the current confirmed connectivity state.
    pub fn state(&self) -> ConnectivityState {
        *self.state_rx.borrow()
    }

    /// Returns true if the last confirmed state is Online.
    pub fn is_online(&self) -> bool {
        self.state().is_online()
    }

    /// Returns a watch receiver that observes confirmed transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state_rx.clone()
    }

    /// Triggers graceful shutdown of the monitor task.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Monitor already stopped".into()))
    }
}

// =============================================================================
// Connectivity Monitor
// =============================================================================

/// Background task probing reachability on a fixed interval.
///
/// ## Usage
/// ```rust,ignore
/// let probe = Arc::new(HttpProbe::new(&config)?);
/// let (handle, task) = ConnectivityMonitor::spawn(probe, &config);
///
/// let mut rx = handle.subscribe();
/// while rx.changed().await.is_ok() {
///     println!("connectivity: {}", *rx.borrow());
/// }
/// ```
pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    interval: Duration,
    offline_threshold: u32,
    state_tx: watch::Sender<ConnectivityState>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ConnectivityMonitor {
    /// Spawns the monitor task. Initial state is Online.
    pub fn spawn(
        probe: Arc<dyn ReachabilityProbe>,
        config: &SyncConfig,
    ) -> (MonitorHandle, JoinHandle<()>) {
        let (state_tx, state_rx) = watch::channel(ConnectivityState::Online);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let monitor = ConnectivityMonitor {
            probe,
            interval: config.probe_interval(),
            offline_threshold: config.offline_threshold,
            state_tx,
            shutdown_rx,
        };

        let task = tokio::spawn(monitor.run());

        let handle = MonitorHandle {
            state_rx,
            shutdown_tx,
        };

        (handle, task)
    }

    /// Main probe loop.
    async fn run(mut self) {
        info!(
            interval = ?self.interval,
            offline_threshold = self.offline_threshold,
            "Connectivity monitor starting"
        );

        let mut consecutive_failures = 0u32;
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let reachable = self.probe.check().await;
                    self.apply_probe_result(reachable, &mut consecutive_failures);
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Connectivity monitor received shutdown signal");
                    break;
                }
            }
        }

        info!("Connectivity monitor stopped");
    }

    /// Folds one probe result into the hysteresis counter, publishing a
    /// transition when (and only when) the confirmed state changes.
    fn apply_probe_result(&self, reachable: bool, consecutive_failures: &mut u32) {
        let current = *self.state_tx.borrow();

        if reachable {
            *consecutive_failures = 0;
            if current == ConnectivityState::Offline {
                info!("Connectivity restored");
                let _ = self.state_tx.send(ConnectivityState::Online);
            }
        } else {
            *consecutive_failures += 1;
            debug!(
                consecutive_failures = *consecutive_failures,
                "Reachability probe failed"
            );
            if current == ConnectivityState::Online
                && *consecutive_failures >= self.offline_threshold
            {
                warn!(
                    consecutive_failures = *consecutive_failures,
                    "Connectivity lost, entering offline mode"
                );
                let _ = self.state_tx.send(ConnectivityState::Offline);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::watch;

    fn test_monitor(threshold: u32) -> (ConnectivityMonitor, watch::Receiver<ConnectivityState>) {
        struct NeverProbe;
        #[async_trait]
        impl ReachabilityProbe for NeverProbe {
            async fn check(&self) -> bool {
                false
            }
        }

        let (state_tx, state_rx) = watch::channel(ConnectivityState::Online);
        let (_shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let monitor = ConnectivityMonitor {
            probe: Arc::new(NeverProbe),
            interval: Duration::from_secs(5),
            offline_threshold: threshold,
            state_tx,
            shutdown_rx,
        };
        (monitor, state_rx)
    }

    #[tokio::test]
    async fn test_single_failure_does_not_flip_offline() {
        let (monitor, rx) = test_monitor(2);
        let mut failures = 0;

        monitor.apply_probe_result(false, &mut failures);
        assert_eq!(*rx.borrow(), ConnectivityState::Online);

        // A success resets the streak; the next lone failure still
        // doesn't reach the threshold.
        monitor.apply_probe_result(true, &mut failures);
        monitor.apply_probe_result(false, &mut failures);
        assert_eq!(*rx.borrow(), ConnectivityState::Online);
        assert_eq!(failures, 1);
    }

    #[tokio::test]
    async fn test_threshold_failures_flip_offline_one_success_flips_back() {
        let (monitor, rx) = test_monitor(2);
        let mut failures = 0;

        monitor.apply_probe_result(false, &mut failures);
        monitor.apply_probe_result(false, &mut failures);
        assert_eq!(*rx.borrow(), ConnectivityState::Offline);

        monitor.apply_probe_result(true, &mut failures);
        assert_eq!(*rx.borrow(), ConnectivityState::Online);
        assert_eq!(failures, 0);
    }

    #[tokio::test]
    async fn test_repeat_results_do_not_republish() {
        let (monitor, mut rx) = test_monitor(2);
        let mut failures = 0;

        monitor.apply_probe_result(false, &mut failures);
        monitor.apply_probe_result(false, &mut failures);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        // Further failures while already offline publish nothing.
        monitor.apply_probe_result(false, &mut failures);
        monitor.apply_probe_result(false, &mut failures);
        assert!(!rx.has_changed().unwrap());
    }
}
