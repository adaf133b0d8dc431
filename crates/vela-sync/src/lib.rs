//! # Vela Sync
//!
//! Offline-first checkout synchronization: connectivity monitoring, a
//! durable queue drained toward the server, and the gateway the POS UI
//! checks out through.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          vela-sync                                      │
//! │                                                                         │
//! │   POS UI                                                                │
//! │     │ checkout(request)                                                 │
//! │     ▼                                                                   │
//! │  ┌──────────────────┐   online    ┌──────────────────┐                 │
//! │  │ CheckoutGateway  │ ──────────► │  CheckoutApi     │ ──► server      │
//! │  │  (gateway)       │             │  (api, reqwest)  │                 │
//! │  └────────┬─────────┘             └──────────────────┘                 │
//! │           │ offline / fallback              ▲                           │
//! │           ▼                                 │ drain                     │
//! │  ┌──────────────────┐   FIFO     ┌──────────┴───────┐                  │
//! │  │  sale queue      │ ─────────► │   SyncEngine     │                  │
//! │  │  (vela-db)       │            │   (engine)       │                  │
//! │  └──────────────────┘            └──────────▲───────┘                  │
//! │                                             │ reconnect                 │
//! │  ┌──────────────────────────────────────────┴───────┐                  │
//! │  │  ConnectivityMonitor (connectivity)              │                  │
//! │  │  probe every N secs, hysteresis, watch channel   │                  │
//! │  └──────────────────────────────────────────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - A finalized sale is always either durably queued or server-confirmed
//! - Queued sales sync in FIFO order, each under a stable idempotency key
//! - Transient failures never drop a sale; only explicit server
//!   rejections settle one without a server record

pub mod api;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod gateway;

pub use api::{CheckoutApi, HttpCheckoutApi, SubmitReply, IDEMPOTENCY_KEY_HEADER};
pub use config::SyncConfig;
pub use connectivity::{ConnectivityMonitor, HttpProbe, MonitorHandle, ReachabilityProbe};
pub use engine::{EngineHandle, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use gateway::{CheckoutGateway, CheckoutOutcome};
