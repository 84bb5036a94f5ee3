//! Database operations for the export queue.
//!
//! The claim happens in a single statement (status transition in the same
//! query that selects the batch, with `FOR UPDATE SKIP LOCKED`), so two
//! workers can never claim overlapping entries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vitrine_core::ProductId;

use super::RepositoryError;
use crate::models::{ExportQueueEntry, QueueOperation, QueueStatus};

/// Internal row type for queue queries.
#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: Uuid,
    product_id: i64,
    operation: String,
    status: String,
    attempts: i32,
    priority: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueueRow> for ExportQueueEntry {
    type Error = RepositoryError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        let operation: QueueOperation = row
            .operation
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let status: QueueStatus = row
            .status
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            product_id: ProductId::new(row.product_id),
            operation,
            status,
            attempts: row.attempts,
            priority: row.priority,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
        })
    }
}

const QUEUE_COLUMNS: &str = "id, product_id, operation, status, attempts, priority, \
                             last_error, created_at, updated_at, started_at";

/// Repository for export queue database operations.
pub struct ExportQueueRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ExportQueueRepository<'a> {
    /// Create a new export queue repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a work item.
    ///
    /// A product with a pending entry is not enqueued twice; the existing
    /// entry keeps the higher of the two priorities.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn enqueue(
        &self,
        product_id: ProductId,
        operation: QueueOperation,
        priority: i32,
    ) -> Result<ExportQueueEntry, RepositoryError> {
        let row = sqlx::query_as::<_, QueueRow>(&format!(
            "INSERT INTO export_queue (id, product_id, operation, status, priority) \
             VALUES ($1, $2, $3, 'pending', $4) \
             ON CONFLICT (product_id) WHERE status = 'pending' DO UPDATE SET \
                 operation = EXCLUDED.operation, \
                 priority = GREATEST(export_queue.priority, EXCLUDED.priority), \
                 updated_at = now() \
             RETURNING {QUEUE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(product_id.as_i64())
        .bind(operation.as_str())
        .bind(priority)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Atomically claim a batch of pending entries.
    ///
    /// Selection and the transition to `processing` happen in one statement;
    /// `FOR UPDATE SKIP LOCKED` keeps concurrent workers from overlapping.
    /// Entries at or beyond `max_attempts` are excluded but kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim_batch(
        &self,
        limit: i64,
        max_attempts: i32,
    ) -> Result<Vec<ExportQueueEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            "UPDATE export_queue \
             SET status = 'processing', attempts = attempts + 1, \
                 started_at = now(), updated_at = now() \
             WHERE id IN ( \
                 SELECT id FROM export_queue \
                 WHERE status = 'pending' AND attempts < $2 \
                 ORDER BY priority DESC, created_at ASC \
                 LIMIT $1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {QUEUE_COLUMNS}"
        ))
        .bind(limit)
        .bind(max_attempts)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Record a successful run for a claimed entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_success(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE export_queue \
             SET status = 'success', last_error = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed run for a claimed entry.
    ///
    /// The entry goes back to `pending` so a later batch retries it; once it
    /// has burned `max_attempts` it is parked as `error` (kept, not deleted).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_error(
        &self,
        id: Uuid,
        error: &str,
        max_attempts: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE export_queue \
             SET status = CASE WHEN attempts >= $3 THEN 'error' ELSE 'pending' END, \
                 last_error = $2, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(max_attempts)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
