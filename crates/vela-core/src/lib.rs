//! # vela-core: Pure Domain Types for Vela POS
//!
//! The domain vocabulary of the offline-first checkout engine, as pure
//! types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Vela POS Architecture                          │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                  UI layer (out of scope)                      │ │
//! │  │        cart editing ──► checkout ──► queue badge              │ │
//! │  └───────────────────────────────┬───────────────────────────────┘ │
//! │                                  │                                  │
//! │  ┌───────────────────────────────▼───────────────────────────────┐ │
//! │  │                vela-sync (gateway + engine)                   │ │
//! │  └───────────────────────────────┬───────────────────────────────┘ │
//! │                                  │                                  │
//! │  ┌───────────────────────────────▼───────────────────────────────┐ │
//! │  │                 ★ vela-core (THIS CRATE) ★                    │ │
//! │  │                                                               │ │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐               │ │
//! │  │   │   types   │  │   money   │  │ validation │               │ │
//! │  │   │SaleRequest│  │   Money   │  │   rules    │               │ │
//! │  │   │  LocalId  │  │  (cents)  │  │   checks   │               │ │
//! │  │   └───────────┘  └───────────┘  └────────────┘               │ │
//! │  │                                                               │ │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (SaleRequest, QueuedSale, LocalId, SyncOutcome)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use validation::validate_sale_request;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Namespace prefix for locally issued queue IDs.
///
/// ## Why a prefix?
/// Server-issued sale IDs are UUIDs. Local IDs carry this reserved prefix so
/// no code path can mistake a queued, unsynced sale for a server-confirmed
/// one; the two ID spaces are disjoint by construction.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Maximum line items in a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
