//! # Local ID Allocator
//!
//! Issues locally unique, monotonic, namespace-tagged sale identifiers.
//!
//! ## Why a Persisted Sequence (and not UUIDs or the clock)?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Requirement                      UUID v4    Wall clock   Sequence  │
//! │  ─────────────────────────────    ───────    ──────────   ────────  │
//! │  Unique on this device              ✓           ✗ (skew)     ✓      │
//! │  Monotonic (FIFO-stable)            ✗           ✗ (skew)     ✓      │
//! │  Survives process restarts          ✓           ✓            ✓      │
//! │  Disjoint from server IDs           ✗           ✓            ✓      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! The sequence's high-water mark lives in the single-row
//! `local_id_sequence` table; allocation is an `UPDATE ... RETURNING` so
//! two concurrent checkouts always receive distinct, ordered IDs.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use vela_core::LocalId;

/// Allocator for locally issued queue IDs.
#[derive(Debug, Clone)]
pub struct LocalIdAllocator {
    pool: SqlitePool,
}

impl LocalIdAllocator {
    /// Creates a new LocalIdAllocator.
    pub fn new(pool: SqlitePool) -> Self {
        LocalIdAllocator { pool }
    }

    /// Allocates the next local ID.
    ///
    /// The increment commits before the ID is handed out, so an ID is
    /// never reissued even if the caller crashes before using it (gaps in
    /// the sequence are harmless, reuse is not).
    pub async fn next_local_id(&self) -> DbResult<LocalId> {
        let mut tx = self.pool.begin().await?;
        let seq = Self::next_seq(&mut tx).await?;
        tx.commit().await?;

        let local_id = LocalId::from_seq(seq);
        debug!(local_id = %local_id, "Allocated local ID");
        Ok(local_id)
    }

    /// Advances the sequence inside an existing transaction.
    ///
    /// Used by the queue repository so that ID allocation and the queue
    /// insert commit atomically.
    pub(crate) async fn next_seq(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ) -> DbResult<u64> {
        let seq: i64 = sqlx::query_scalar(
            "UPDATE local_id_sequence SET next_seq = next_seq + 1 WHERE id = 1 RETURNING next_seq",
        )
        .fetch_one(&mut **tx)
        .await?;

        Ok(seq as u64)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
