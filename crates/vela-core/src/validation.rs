//! # Validation Module
//!
//! Business rule validation for checkout requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Checkout Gateway (vela-sync)                              │
//! │  └── THIS MODULE: invariants before a sale is queued or submitted   │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: Database (SQLite)                                         │
//! │  └── NOT NULL / UNIQUE constraints on the queue                     │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Remote checkout API                                       │
//! │  └── authoritative stock/price checks (may reject)                  │
//! │                                                                     │
//! │  An invalid sale is a caller error; it is never enqueued.           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::SaleRequest;
use crate::{MAX_LINE_QUANTITY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be non-negative; zero is allowed (free items)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a UUID string (user and product identifiers).
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Sale Request Validation
// =============================================================================

/// Validates a complete checkout request.
///
/// ## Checks
/// - At least one line item, at most MAX_SALE_ITEMS
/// - Every quantity and unit price is in range
/// - Every `line_total_cents == quantity × unit_price_cents` (checked mul)
/// - `total_cents` equals the sum of line totals (checked add)
/// - `user_id` and every `product_id` are valid UUIDs
pub fn validate_sale_request(request: &SaleRequest) -> CoreResult<()> {
    if request.items.is_empty() {
        return Err(CoreError::EmptySale);
    }

    if request.items.len() > MAX_SALE_ITEMS {
        return Err(CoreError::TooManyItems {
            max: MAX_SALE_ITEMS,
        });
    }

    validate_uuid("user_id", &request.user_id)?;

    for (index, line) in request.items.iter().enumerate() {
        validate_uuid("product_id", &line.product_id)?;
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price_cents)?;

        let expected = line
            .unit_price()
            .checked_mul(line.quantity)
            .ok_or(CoreError::AmountOverflow { index })?;

        if expected.cents() != line.line_total_cents {
            return Err(CoreError::LineTotalMismatch {
                index,
                expected_cents: expected.cents(),
                actual_cents: line.line_total_cents,
            });
        }
    }

    let computed = request
        .computed_total()
        .ok_or(CoreError::AmountOverflow { index: 0 })?;

    if computed.cents() != request.total_cents {
        return Err(CoreError::TotalMismatch {
            expected_cents: computed.cents(),
            actual_cents: request.total_cents,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
