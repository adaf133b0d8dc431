//! # Sale Queue Repository
//!
//! The durable, ordered store of sales accepted locally but not yet
//! confirmed by the server.
//!
//! ## Queue Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       sale_queue Table                              │
//! │                                                                     │
//! │  seq | local_id           | payload | attempts | last_error         │
//! │  ────┼────────────────────┼─────────┼──────────┼─────────────       │
//! │  1   │ local-000000000001 │ {...}   │ 0        │ NULL               │
//! │  2   │ local-000000000002 │ {...}   │ 3        │ "timed out"        │
//! │                                                                     │
//! │  WRITE PATHS (each a single transaction):                           │
//! │  • enqueue          gateway, offline path (allocates the ID)        │
//! │  • enqueue_reserved gateway, online fallback (reuses the ID of the  │
//! │                     failed direct attempt so the server can dedup)  │
//! │  • record_attempt   sync engine only                                │
//! │  • remove           sync engine on terminal outcome (idempotent)    │
//! │                                                                     │
//! │  READ PATHS (never block writers):                                  │
//! │  • snapshot / peek_oldest / count                                   │
//! │                                                                     │
//! │  ORDER: drains iterate by `seq` (checkout acceptance order), never  │
//! │  by local_id, so FIFO holds even when an ID was reserved before a   │
//! │  direct submission.                                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::allocator::LocalIdAllocator;
use vela_core::{LocalId, QueuedSale, SaleRequest};

/// Repository for the durable sale queue.
#[derive(Debug, Clone)]
pub struct SaleQueueRepository {
    pool: SqlitePool,
}

impl SaleQueueRepository {
    /// Creates a new SaleQueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleQueueRepository { pool }
    }

    /// Enqueues a sale, allocating a fresh local ID.
    ///
    /// ID allocation and the insert commit in one transaction: either the
    /// sale is durably queued under its ID, or neither happened. A
    /// persistence failure is returned to the caller, never swallowed.
    pub async fn enqueue(&self, request: &SaleRequest) -> DbResult<LocalId> {
        let payload = serde_json::to_string(request)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let seq = LocalIdAllocator::next_seq(&mut tx).await?;
        let local_id = LocalId::from_seq(seq);

        sqlx::query(
            r#"
            INSERT INTO sale_queue (local_id, payload, attempts, enqueued_at)
            VALUES (?1, ?2, 0, ?3)
            "#,
        )
        .bind(local_id.as_str())
        .bind(&payload)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(local_id = %local_id, total_cents = request.total_cents, "Sale queued");
        Ok(local_id)
    }

    /// Enqueues a sale under an already-allocated local ID.
    ///
    /// Used by the gateway's online fallback: the direct submission already
    /// went out under this ID as its idempotency key, so the queued retry
    /// must reuse it: if the timed-out call actually reached the server,
    /// the resubmission deduplicates instead of double-charging.
    pub async fn enqueue_reserved(
        &self,
        local_id: &LocalId,
        request: &SaleRequest,
    ) -> DbResult<()> {
        let payload = serde_json::to_string(request)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sale_queue (local_id, payload, attempts, enqueued_at)
            VALUES (?1, ?2, 0, ?3)
            "#,
        )
        .bind(local_id.as_str())
        .bind(&payload)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(local_id = %local_id, "Sale queued under reserved ID");
        Ok(())
    }

    /// Returns the oldest queued sale, or None if the queue is empty.
    pub async fn peek_oldest(&self) -> DbResult<Option<QueuedSale>> {
        let row = sqlx::query(
            r#"
            SELECT local_id, payload, attempts, last_error, enqueued_at, attempted_at
            FROM sale_queue
            ORDER BY seq ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_queued_sale).transpose()
    }

    /// Removes a queued sale on terminal outcome.
    ///
    /// Idempotent: removing an absent ID is a no-op, not an error (a retry
    /// after a crash may try to remove an already-removed entry).
    pub async fn remove(&self, local_id: &LocalId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sale_queue WHERE local_id = ?1")
            .bind(local_id.as_str())
            .execute(&self.pool)
            .await?;

        debug!(
            local_id = %local_id,
            removed = result.rows_affected(),
            "Queue entry removed"
        );
        Ok(())
    }

    /// Returns all queued sales in FIFO (checkout acceptance) order.
    /// Read-only; safe to call concurrently with writes.
    pub async fn snapshot(&self) -> DbResult<Vec<QueuedSale>> {
        let rows = sqlx::query(
            r#"
            SELECT local_id, payload, attempts, last_error, enqueued_at, attempted_at
            FROM sale_queue
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_queued_sale).collect()
    }

    /// Counts queued sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_queue")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Records a failed drain attempt (Sync Engine only).
    ///
    /// Increments the attempt counter and stores the failure reason; the
    /// entry itself stays queued, unchanged and in position.
    pub async fn record_attempt(&self, local_id: &LocalId, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sale_queue SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE local_id = ?1
            "#,
        )
        .bind(local_id.as_str())
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Decodes one `sale_queue` row into a QueuedSale.
fn row_to_queued_sale(row: SqliteRow) -> DbResult<QueuedSale> {
    let local_id_raw: String = row.try_get("local_id")?;
    let payload: String = row.try_get("payload")?;
    let attempts: i64 = row.try_get("attempts")?;
    let last_error: Option<String> = row.try_get("last_error")?;
    let enqueued_at: DateTime<Utc> = row.try_get("enqueued_at")?;
    let attempted_at: Option<DateTime<Utc>> = row.try_get("attempted_at")?;

    let local_id = LocalId::parse(&local_id_raw).map_err(|e| DbError::CorruptEntry {
        local_id: local_id_raw.clone(),
        reason: e.to_string(),
    })?;

    let request: SaleRequest =
        serde_json::from_str(&payload).map_err(|e| DbError::CorruptEntry {
            local_id: local_id_raw,
            reason: e.to_string(),
        })?;

    Ok(QueuedSale {
        local_id,
        request,
        enqueued_at,
        attempts,
        last_error,
        attempted_at,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use vela_core::{PaymentMethod, SaleLine, SaleRequest};

    fn sample_request(total_cents: i64) -> SaleRequest {
        SaleRequest {
            created_at: Utc::now(),
            items: vec![SaleLine {
                product_id: uuid::Uuid::new_v4().to_string(),
                quantity: 1,
                unit_price_cents: total_cents,
                line_total_cents: total_cents,
            }],
            total_cents,
            user_id: uuid::Uuid::new_v4().to_string(),
            payment_method: PaymentMethod::Cash,
            is_paid: true,
            table_id: None,
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        assert_eq!(queue.count().await.unwrap(), 0);

        let a = queue.enqueue(&sample_request(100)).await.unwrap();
        let b = queue.enqueue(&sample_request(200)).await.unwrap();

        assert_eq!(queue.count().await.unwrap(), 2);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_snapshot_is_fifo() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        let a = queue.enqueue(&sample_request(100)).await.unwrap();
        let b = queue.enqueue(&sample_request(200)).await.unwrap();
        let c = queue.enqueue(&sample_request(300)).await.unwrap();

        let snapshot = queue.snapshot().await.unwrap();
        let ids: Vec<_> = snapshot.iter().map(|q| q.local_id.clone()).collect();
        assert_eq!(ids, vec![a.clone(), b, c]);

        let oldest = queue.peek_oldest().await.unwrap().unwrap();
        assert_eq!(oldest.local_id, a);
        assert_eq!(oldest.request.total_cents, 100);
        assert_eq!(oldest.attempts, 0);
        assert!(oldest.last_error.is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        let id = queue.enqueue(&sample_request(100)).await.unwrap();

        queue.remove(&id).await.unwrap();
        assert_eq!(queue.count().await.unwrap(), 0);

        // Removing an absent ID is a no-op, not an error.
        queue.remove(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_record_attempt_preserves_position() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();

        let a = queue.enqueue(&sample_request(100)).await.unwrap();
        let _b = queue.enqueue(&sample_request(200)).await.unwrap();

        queue.record_attempt(&a, "request timed out").await.unwrap();
        queue.record_attempt(&a, "HTTP 503").await.unwrap();

        let snapshot = queue.snapshot().await.unwrap();
        // Still first in line, with the failure bookkeeping updated.
        assert_eq!(snapshot[0].local_id, a);
        assert_eq!(snapshot[0].attempts, 2);
        assert_eq!(snapshot[0].last_error.as_deref(), Some("HTTP 503"));
        assert!(snapshot[0].attempted_at.is_some());
    }

    #[tokio::test]
    async fn test_enqueue_reserved_keeps_acceptance_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();
        let allocator = db.allocator();

        // ID reserved first (direct attempt in flight)...
        let reserved = allocator.next_local_id().await.unwrap();
        // ...meanwhile another checkout lands in the queue.
        let other = queue.enqueue(&sample_request(200)).await.unwrap();
        // Direct attempt fails, the reserved ID is queued after.
        queue
            .enqueue_reserved(&reserved, &sample_request(100))
            .await
            .unwrap();

        let snapshot = queue.snapshot().await.unwrap();
        let ids: Vec<_> = snapshot.iter().map(|q| q.local_id.clone()).collect();
        // FIFO is acceptance order, not ID order.
        assert_eq!(ids, vec![other, reserved]);
    }

    #[tokio::test]
    async fn test_duplicate_local_id_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let queue = db.queue();
        let allocator = db.allocator();

        let id = allocator.next_local_id().await.unwrap();
        queue
            .enqueue_reserved(&id, &sample_request(100))
            .await
            .unwrap();

        let err = queue.enqueue_reserved(&id, &sample_request(100)).await;
        assert!(err.is_err());
    }
}
