//! # vela-db: Queue Persistence for Vela POS
//!
//! Durable storage for the offline sale queue, backed by SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Vela POS Data Flow                            │
//! │                                                                     │
//! │  CheckoutGateway / SyncEngine (vela-sync)                           │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                    vela-db (THIS CRATE)                       │ │
//! │  │                                                               │ │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐  │ │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations  │  │ │
//! │  │   │   (pool.rs)   │◄──│  queue.rs      │   │  (embedded)  │  │ │
//! │  │   │   SqlitePool  │   │  allocator.rs  │   │  001_....sql │  │ │
//! │  │   └───────────────┘   └────────────────┘   └──────────────┘  │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (WAL mode)                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Durability Contract
//! A persistence failure here is fatal to the calling operation and is
//! always propagated as [`DbError`]; it is never swallowed. The whole
//! offline-first design rests on "accepted locally" meaning "on disk".
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Queue and allocator repositories

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::allocator::LocalIdAllocator;
pub use repository::queue::SaleQueueRepository;
