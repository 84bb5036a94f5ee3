//! Database operations for sync mapping entries.
//!
//! The mapping table is the single source of truth for "does a remote
//! entity already exist for this local product". Every sync attempt -
//! successful or not - lands here; remote IDs are cleared (never the whole
//! row) when the remote entity disappears.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use vitrine_core::{ProductId, SyncShape};

use super::RepositoryError;
use crate::models::{MappingEntry, SyncOutcome, TrackedFields};

/// Unique index guaranteeing at most one local product per
/// (remote product, remote variant) pair.
const REMOTE_VARIANT_INDEX: &str = "idx_channel_mappings_remote_variant";

/// Internal row type for mapping queries.
#[derive(Debug, sqlx::FromRow)]
struct MappingRow {
    product_id: i64,
    shape: String,
    parent_product_id: Option<i64>,
    sku: String,
    barcode: Option<String>,
    remote_product_id: Option<String>,
    remote_variant_id: Option<String>,
    last_outcome: String,
    last_error: Option<String>,
    attempts: i32,
    snapshot: Option<serde_json::Value>,
    needs_update: bool,
    category: Option<String>,
    product_group: Option<String>,
    subgroup: Option<String>,
    name: Option<String>,
    price: Option<Decimal>,
    stock: Option<Decimal>,
    weight: Option<Decimal>,
    height: Option<Decimal>,
    width: Option<Decimal>,
    depth: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MappingRow> for MappingEntry {
    type Error = RepositoryError;

    fn try_from(row: MappingRow) -> Result<Self, Self::Error> {
        let shape: SyncShape = row
            .shape
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let last_outcome: SyncOutcome = row
            .last_outcome
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            shape,
            parent_product_id: row.parent_product_id.map(ProductId::new),
            sku: row.sku,
            barcode: row.barcode,
            remote_product_id: row.remote_product_id,
            remote_variant_id: row.remote_variant_id,
            last_outcome,
            last_error: row.last_error,
            attempts: row.attempts,
            snapshot: row.snapshot,
            needs_update: row.needs_update,
            tracked: TrackedFields {
                category: row.category,
                group: row.product_group,
                subgroup: row.subgroup,
                name: row.name,
                price: row.price,
                stock: row.stock,
                weight: row.weight,
                height: row.height,
                width: row.width,
                depth: row.depth,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const MAPPING_COLUMNS: &str = "product_id, shape, parent_product_id, sku, barcode, \
                               remote_product_id, remote_variant_id, last_outcome, last_error, \
                               attempts, snapshot, needs_update, category, product_group, \
                               subgroup, name, price, stock, weight, height, width, depth, \
                               created_at, updated_at";

/// Input for recording a successful sync attempt.
#[derive(Debug, Clone)]
pub struct RecordSuccess {
    pub product_id: ProductId,
    pub shape: SyncShape,
    pub parent_product_id: Option<ProductId>,
    pub sku: String,
    pub barcode: Option<String>,
    pub remote_product_id: String,
    pub remote_variant_id: Option<String>,
    /// Payload as sent, stored as the comparison snapshot.
    pub snapshot: serde_json::Value,
    /// Tracked field values captured at send time.
    pub tracked: TrackedFields,
}

/// Input for recording a failed sync attempt.
///
/// Failures never touch the snapshot, the tracked fields, or the remote IDs.
#[derive(Debug, Clone)]
pub struct RecordFailure {
    pub product_id: ProductId,
    pub shape: SyncShape,
    pub parent_product_id: Option<ProductId>,
    pub sku: String,
    pub barcode: Option<String>,
    pub error: String,
}

/// Repository for sync mapping database operations.
pub struct MappingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MappingRepository<'a> {
    /// Create a new mapping repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the mapping entry for a local product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a stored enum is unreadable.
    pub async fn get(&self, product_id: ProductId) -> Result<Option<MappingEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, MappingRow>(&format!(
            "SELECT {MAPPING_COLUMNS} FROM channel_mappings WHERE product_id = $1"
        ))
        .bind(product_id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// All mapping entries, ordered by local product ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a stored enum is unreadable.
    pub async fn list_all(&self) -> Result<Vec<MappingEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, MappingRow>(&format!(
            "SELECT {MAPPING_COLUMNS} FROM channel_mappings ORDER BY product_id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Record a successful sync attempt.
    ///
    /// Creates the entry on first contact; afterwards updates remote IDs,
    /// snapshot, and tracked fields, clears the error state, and resets the
    /// `needs_update` flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another local product is
    /// already mapped to the same (remote product, remote variant) pair.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn record_success(&self, input: &RecordSuccess) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO channel_mappings ( \
                 product_id, shape, parent_product_id, sku, barcode, \
                 remote_product_id, remote_variant_id, last_outcome, last_error, attempts, \
                 snapshot, needs_update, category, product_group, subgroup, name, \
                 price, stock, weight, height, width, depth \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'ok', NULL, 1, \
                     $8, FALSE, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             ON CONFLICT (product_id) DO UPDATE SET \
                 shape = EXCLUDED.shape, \
                 parent_product_id = EXCLUDED.parent_product_id, \
                 sku = EXCLUDED.sku, \
                 barcode = EXCLUDED.barcode, \
                 remote_product_id = EXCLUDED.remote_product_id, \
                 remote_variant_id = EXCLUDED.remote_variant_id, \
                 last_outcome = 'ok', \
                 last_error = NULL, \
                 attempts = channel_mappings.attempts + 1, \
                 snapshot = EXCLUDED.snapshot, \
                 needs_update = FALSE, \
                 category = EXCLUDED.category, \
                 product_group = EXCLUDED.product_group, \
                 subgroup = EXCLUDED.subgroup, \
                 name = EXCLUDED.name, \
                 price = EXCLUDED.price, \
                 stock = EXCLUDED.stock, \
                 weight = EXCLUDED.weight, \
                 height = EXCLUDED.height, \
                 width = EXCLUDED.width, \
                 depth = EXCLUDED.depth, \
                 updated_at = now()",
        )
        .bind(input.product_id.as_i64())
        .bind(input.shape.to_string())
        .bind(input.parent_product_id.map(|p| p.as_i64()))
        .bind(&input.sku)
        .bind(&input.barcode)
        .bind(&input.remote_product_id)
        .bind(&input.remote_variant_id)
        .bind(&input.snapshot)
        .bind(&input.tracked.category)
        .bind(&input.tracked.group)
        .bind(&input.tracked.subgroup)
        .bind(&input.tracked.name)
        .bind(input.tracked.price)
        .bind(input.tracked.stock)
        .bind(input.tracked.weight)
        .bind(input.tracked.height)
        .bind(input.tracked.width)
        .bind(input.tracked.depth)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(REMOTE_VARIANT_INDEX)
            {
                return RepositoryError::Conflict(
                    "another local product is already mapped to this remote variant".to_string(),
                );
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    /// Record a failed sync attempt.
    ///
    /// Increments the attempt counter and stores the error text without
    /// touching the snapshot, tracked fields, or remote IDs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_failure(&self, input: &RecordFailure) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO channel_mappings ( \
                 product_id, shape, parent_product_id, sku, barcode, \
                 last_outcome, last_error, attempts \
             ) \
             VALUES ($1, $2, $3, $4, $5, 'error', $6, 1) \
             ON CONFLICT (product_id) DO UPDATE SET \
                 shape = EXCLUDED.shape, \
                 parent_product_id = EXCLUDED.parent_product_id, \
                 sku = EXCLUDED.sku, \
                 barcode = EXCLUDED.barcode, \
                 last_outcome = 'error', \
                 last_error = EXCLUDED.last_error, \
                 attempts = channel_mappings.attempts + 1, \
                 updated_at = now()",
        )
        .bind(input.product_id.as_i64())
        .bind(input.shape.to_string())
        .bind(input.parent_product_id.map(|p| p.as_i64()))
        .bind(&input.sku)
        .bind(&input.barcode)
        .bind(&input.error)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Clear the remote identifiers after the remote entity disappeared.
    ///
    /// The row itself is kept so the next sync re-creates without losing
    /// attempt history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_remote_ids(&self, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE channel_mappings \
             SET remote_product_id = NULL, remote_variant_id = NULL, updated_at = now() \
             WHERE product_id = $1",
        )
        .bind(product_id.as_i64())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Persist the divergence detector's verdict.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_needs_update(
        &self,
        product_id: ProductId,
        needs_update: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE channel_mappings SET needs_update = $2, updated_at = now() \
             WHERE product_id = $1",
        )
        .bind(product_id.as_i64())
        .bind(needs_update)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
