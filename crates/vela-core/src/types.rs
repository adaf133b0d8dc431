//! # Domain Types
//!
//! Core domain types for the offline-first checkout engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────┐  │
//! │  │   SaleRequest   │   │   QueuedSale    │   │     LocalId      │  │
//! │  │  ─────────────  │   │  ─────────────  │   │  ──────────────  │  │
//! │  │  items[]        │   │  local_id       │   │  local-<seq>     │  │
//! │  │  total_cents    │   │  request        │   │  monotonic       │  │
//! │  │  user_id        │   │  attempts       │   │  namespace-      │  │
//! │  │  payment_method │   │  last_error     │   │  tagged          │  │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────┘  │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────┐  │
//! │  │   SyncOutcome   │   │   DrainReport   │   │ConnectivityState │  │
//! │  │  Synced         │   │  outcomes[]     │   │  Online          │  │
//! │  │  Retryable      │   │  disposition    │   │  Offline         │  │
//! │  │  Rejected       │   │  stuck[]        │   │                  │  │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual ID Spaces
//! A sale carries exactly one of two identifiers at any time:
//! - `LocalId` (`local-000000000042`) while queued on-device
//! - a server-issued UUID once confirmed
//!
//! The `local-` prefix keeps the spaces disjoint; no code path can confuse
//! a pending sale with a confirmed one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::money::Money;
use crate::LOCAL_ID_PREFIX;

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    ExternalCard,
}

// =============================================================================
// Sale Request
// =============================================================================

/// A line item in a sale. Prices are frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    /// Product being sold (UUID).
    pub product_id: String,

    /// Quantity sold.
    pub quantity: i64,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Line total (`quantity × unit_price_cents`).
    pub line_total_cents: i64,
}

impl SaleLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// An immutable checkout request.
///
/// Invariant: `total_cents` equals the sum of line totals, each of which is
/// `quantity × unit_price_cents`. Enforced by
/// [`validate_sale_request`](crate::validation::validate_sale_request)
/// before a sale is submitted or queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRequest {
    /// When the sale was rung up on the device.
    pub created_at: DateTime<Utc>,

    /// Ordered line items.
    pub items: Vec<SaleLine>,

    /// Total amount in cents.
    pub total_cents: i64,

    /// Acting cashier/operator (UUID).
    pub user_id: String,

    /// How the customer paid.
    pub payment_method: PaymentMethod,

    /// Whether payment was collected at checkout.
    pub is_paid: bool,

    /// Optional table reference (hospitality mode).
    pub table_id: Option<String>,
}

impl SaleRequest {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Computes the sum of line totals with overflow checking.
    ///
    /// ## Returns
    /// `None` if any line total or the running sum overflows i64 cents.
    pub fn computed_total(&self) -> Option<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, line| {
            acc.checked_add(Money::from_cents(line.line_total_cents))
        })
    }
}

// =============================================================================
// Local ID
// =============================================================================

/// A locally issued, namespace-tagged queue identifier.
///
/// Format: `local-<seq:012>` where `<seq>` is a zero-padded monotonic
/// sequence number. Zero-padding makes lexicographic order equal numeric
/// order, so local IDs sort in issue order.
///
/// ## Properties
/// - Unique within the device's lifetime (sequence is persisted)
/// - Monotonically increasing across process restarts
/// - Disjoint from server-issued UUIDs (reserved `local-` prefix)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(String);

impl LocalId {
    /// Width of the zero-padded sequence component.
    const SEQ_WIDTH: usize = 12;

    /// Creates a LocalId from a sequence number.
    pub fn from_seq(seq: u64) -> Self {
        LocalId(format!(
            "{}{:0width$}",
            LOCAL_ID_PREFIX,
            seq,
            width = Self::SEQ_WIDTH
        ))
    }

    /// Parses a LocalId from its string form.
    ///
    /// ## Errors
    /// `ValidationError::InvalidFormat` if the prefix or sequence digits
    /// are malformed.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let digits = s
            .strip_prefix(LOCAL_ID_PREFIX)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "local_id".to_string(),
                reason: format!("must start with '{}'", LOCAL_ID_PREFIX),
            })?;

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: "local_id".to_string(),
                reason: "sequence component must be numeric".to_string(),
            });
        }

        Ok(LocalId(s.to_string()))
    }

    /// Returns the underlying string (used as the idempotency key).
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the sequence number component.
    pub fn seq(&self) -> u64 {
        self.0
            .strip_prefix(LOCAL_ID_PREFIX)
            .and_then(|d| d.parse().ok())
            .unwrap_or(0)
    }

    /// True if `s` belongs to the local ID namespace.
    #[inline]
    pub fn is_local(s: &str) -> bool {
        s.starts_with(LOCAL_ID_PREFIX)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Queued Sale
// =============================================================================

/// A sale accepted locally but not yet confirmed by the server.
///
/// Created only by the Checkout Gateway when a sale cannot be confirmed
/// synchronously; `attempts`/`last_error` are mutated only by the Sync
/// Engine during a drain; removed only on a terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedSale {
    /// Locally issued identifier, doubles as the idempotency key.
    pub local_id: LocalId,

    /// The frozen checkout request.
    pub request: SaleRequest,

    /// When the sale entered the queue.
    pub enqueued_at: DateTime<Utc>,

    /// Number of drain submissions attempted so far.
    pub attempts: i64,

    /// Last failure reason, if any attempt failed.
    pub last_error: Option<String>,

    /// When the last drain attempt ran.
    pub attempted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Connectivity State
// =============================================================================

/// Confirmed connectivity state, after hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    #[inline]
    pub const fn is_online(&self) -> bool {
        matches!(self, ConnectivityState::Online)
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityState::Online => write!(f, "online"),
            ConnectivityState::Offline => write!(f, "offline"),
        }
    }
}

// =============================================================================
// Sync Outcome
// =============================================================================

/// Result of submitting one queued sale to the remote checkout API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Confirmed by the server; the sale left the queue.
    Synced {
        local_id: LocalId,
        server_id: String,
    },
    /// Transient failure; the sale stays queued unchanged.
    Retryable { local_id: LocalId, reason: String },
    /// Deterministic server refusal; the sale left the queue and will
    /// never succeed unmodified.
    Rejected { local_id: LocalId, reason: String },
}

impl SyncOutcome {
    /// The queued sale this outcome refers to.
    pub fn local_id(&self) -> &LocalId {
        match self {
            SyncOutcome::Synced { local_id, .. }
            | SyncOutcome::Retryable { local_id, .. }
            | SyncOutcome::Rejected { local_id, .. } => local_id,
        }
    }
}

// =============================================================================
// Drain Report
// =============================================================================

/// How a drain pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainDisposition {
    /// Every queued sale reached a terminal outcome.
    Completed,
    /// Stopped at the first transient failure; a backoff retry is scheduled.
    StoppedRetryable,
    /// Stopped by an external stop signal or a persistence failure; the
    /// queue is exactly as it was before the aborted item.
    Aborted,
}

/// The result of one serialized drain pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Per-item outcomes in FIFO order, up to the point the pass stopped.
    pub outcomes: Vec<SyncOutcome>,

    /// How the pass ended.
    pub disposition: DrainDisposition,

    /// Sales whose attempt count crossed the stuck threshold during this
    /// pass. They stay queued and keep being retried, but the operator
    /// should be told.
    pub stuck: Vec<LocalId>,
}

impl DrainReport {
    /// An empty, successfully completed pass (nothing was queued).
    pub fn empty() -> Self {
        DrainReport {
            outcomes: Vec::new(),
            disposition: DrainDisposition::Completed,
            stuck: Vec::new(),
        }
    }

    /// A pass that stopped before touching anything.
    pub fn aborted() -> Self {
        DrainReport {
            outcomes: Vec::new(),
            disposition: DrainDisposition::Aborted,
            stuck: Vec::new(),
        }
    }

    /// Number of sales confirmed in this pass.
    pub fn synced_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SyncOutcome::Synced { .. }))
            .count()
    }

    /// Number of sales rejected in this pass.
    pub fn rejected_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SyncOutcome::Rejected { .. }))
            .count()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64, unit: i64) -> SaleLine {
        SaleLine {
            product_id: "11111111-1111-1111-1111-111111111111".to_string(),
            quantity: qty,
            unit_price_cents: unit,
            line_total_cents: qty * unit,
        }
    }

    #[test]
    fn test_local_id_format_and_order() {
        let a = LocalId::from_seq(9);
        let b = LocalId::from_seq(10);
        assert_eq!(a.as_str(), "local-000000000009");
        assert_eq!(a.seq(), 9);
        // Zero-padding keeps lexicographic order equal to issue order.
        assert!(a < b);
    }

    #[test]
    fn test_local_id_parse() {
        assert!(LocalId::parse("local-000000000042").is_ok());
        assert!(LocalId::parse("local-").is_err());
        assert!(LocalId::parse("local-12ab").is_err());
        assert!(LocalId::parse("550e8400-e29b-41d4-a716-446655440000").is_err());
    }

    #[test]
    fn test_id_spaces_disjoint() {
        assert!(LocalId::is_local("local-000000000001"));
        assert!(!LocalId::is_local("550e8400-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn test_computed_total() {
        let request = SaleRequest {
            created_at: Utc::now(),
            items: vec![line(2, 1099), line(1, 500)],
            total_cents: 2698,
            user_id: "22222222-2222-2222-2222-222222222222".to_string(),
            payment_method: PaymentMethod::Cash,
            is_paid: true,
            table_id: None,
        };
        assert_eq!(request.computed_total(), Some(Money::from_cents(2698)));
    }

    #[test]
    fn test_drain_report_counts() {
        let report = DrainReport {
            outcomes: vec![
                SyncOutcome::Synced {
                    local_id: LocalId::from_seq(1),
                    server_id: "s-1".to_string(),
                },
                SyncOutcome::Rejected {
                    local_id: LocalId::from_seq(2),
                    reason: "insufficient stock".to_string(),
                },
            ],
            disposition: DrainDisposition::Completed,
            stuck: Vec::new(),
        };
        assert_eq!(report.synced_count(), 1);
        assert_eq!(report.rejected_count(), 1);
    }

    #[test]
    fn test_sync_outcome_serde_tag() {
        let outcome = SyncOutcome::Retryable {
            local_id: LocalId::from_seq(3),
            reason: "timeout".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"kind\":\"retryable\""));
    }
}
