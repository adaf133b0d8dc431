//! # Error Types
//!
//! Domain-specific error types for vela-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  vela-core errors (this file)                                       │
//! │  ├── CoreError        - Sale invariant violations                   │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  vela-db errors (separate crate)                                    │
//! │  └── DbError          - Persistence failures                        │
//! │                                                                     │
//! │  vela-sync errors (separate crate)                                  │
//! │  └── SyncError        - Network, rejection, drain failures          │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → SyncError → caller             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (local ID, line index, amounts)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Sale-level invariant violations.
///
/// These represent a sale that must not be accepted, queued, or submitted.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Sale contains no line items.
    #[error("Sale must contain at least one item")]
    EmptySale,

    /// Sale has more line items than allowed.
    #[error("Sale cannot have more than {max} items")]
    TooManyItems { max: usize },

    /// A line's stored total does not match quantity × unit price.
    #[error("Line {index} total mismatch: expected {expected_cents} cents, got {actual_cents}")]
    LineTotalMismatch {
        index: usize,
        expected_cents: i64,
        actual_cents: i64,
    },

    /// The sale total does not match the sum of line totals.
    ///
    /// ## When This Occurs
    /// - The caller computed the total with floating point and drifted
    /// - A line was edited after the total was computed
    #[error("Sale total mismatch: expected {expected_cents} cents, got {actual_cents}")]
    TotalMismatch {
        expected_cents: i64,
        actual_cents: i64,
    },

    /// Amount arithmetic overflowed i64 cents.
    #[error("Amount overflow at line {index}")]
    AmountOverflow { index: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for early
/// validation before a sale reaches the queue or the wire.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed local ID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
