//! Database operations for local products and variant declarations.
//!
//! The sync engine treats the product table as read-only except for the
//! channel tag and the clamped stock update.

use rust_decimal::Decimal;
use sqlx::PgPool;

use chrono::{DateTime, Utc};
use vitrine_core::{GradeId, ProductId};

use super::RepositoryError;
use crate::models::{GradeDeclaration, LocalProduct};

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    description: Option<String>,
    gtin: Option<String>,
    price: Option<Decimal>,
    stock: Option<Decimal>,
    weight: Option<Decimal>,
    height: Option<Decimal>,
    width: Option<Decimal>,
    depth: Option<Decimal>,
    category: Option<String>,
    product_group: Option<String>,
    subgroup: Option<String>,
    image_urls: Vec<String>,
    channel_tag: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for LocalProduct {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            description: row.description,
            gtin: row.gtin,
            price: row.price,
            stock: row.stock,
            weight: row.weight,
            height: row.height,
            width: row.width,
            depth: row.depth,
            category: row.category,
            group: row.product_group,
            subgroup: row.subgroup,
            image_urls: row.image_urls,
            channel_tag: row.channel_tag,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for grade declaration queries.
#[derive(Debug, sqlx::FromRow)]
struct GradeRow {
    id: i64,
    parent_id: i64,
    variant_id: i64,
    axis_name: Option<String>,
    axis_value: Option<String>,
    position: i32,
}

impl From<GradeRow> for GradeDeclaration {
    fn from(row: GradeRow) -> Self {
        Self {
            id: GradeId::new(row.id),
            parent_id: ProductId::new(row.parent_id),
            variant_id: ProductId::new(row.variant_id),
            axis_name: row.axis_name,
            axis_value: row.axis_value,
            position: row.position,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, description, gtin, price, stock, weight, height, width, \
                               depth, category, product_group, subgroup, image_urls, \
                               channel_tag, created_at, updated_at";

/// Repository for local product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<LocalProduct>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get several products by ID, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<LocalProduct>, RepositoryError> {
        let raw_ids: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&raw_ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Ordered variant declarations for a parent product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn grades_for(
        &self,
        parent_id: ProductId,
    ) -> Result<Vec<GradeDeclaration>, RepositoryError> {
        let rows = sqlx::query_as::<_, GradeRow>(
            "SELECT id, parent_id, variant_id, axis_name, axis_value, position \
             FROM product_grades \
             WHERE parent_id = $1 \
             ORDER BY position ASC, id ASC",
        )
        .bind(parent_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The parent a product is declared under, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn parent_of(&self, id: ProductId) -> Result<Option<ProductId>, RepositoryError> {
        let parent: Option<(i64,)> =
            sqlx::query_as("SELECT parent_id FROM product_grades WHERE variant_id = $1 LIMIT 1")
                .bind(id.as_i64())
                .fetch_optional(self.pool)
                .await?;

        Ok(parent.map(|(id,)| ProductId::new(id)))
    }

    /// Resolve a product by barcode/GTIN.
    ///
    /// This is the only resolution path the order processor may use: SKUs
    /// are shared across a parent/variant family and remote variant IDs are
    /// not trusted, so neither identifies a sellable unit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<ProductId>, RepositoryError> {
        let trimmed = barcode.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let found: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM products WHERE gtin = $1 LIMIT 1")
                .bind(trimmed)
                .fetch_optional(self.pool)
                .await?;

        Ok(found.map(|(id,)| ProductId::new(id)))
    }

    /// Stamp the product's channel tag (`S`/`P`/`V`, or clear it).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_channel_tag(
        &self,
        id: ProductId,
        tag: Option<char>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE products SET channel_tag = $2, updated_at = now() WHERE id = $1")
            .bind(id.as_i64())
            .bind(tag.map(String::from))
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Apply a clamped stock delta in a single atomic statement.
    ///
    /// The read-modify-write happens entirely inside the database
    /// (`GREATEST(floor, stock + delta)`), so concurrent deliveries for
    /// different orders touching the same product never lose updates, and
    /// the result can never go below the floor.
    ///
    /// Returns the resulting stock value, or `None` if the product row does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn apply_stock_delta(
        &self,
        id: ProductId,
        delta: Decimal,
        floor: Decimal,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let updated: Option<(Decimal,)> = sqlx::query_as(
            "UPDATE products \
             SET stock = GREATEST($3, COALESCE(stock, 0) + $2), updated_at = now() \
             WHERE id = $1 \
             RETURNING stock",
        )
        .bind(id.as_i64())
        .bind(delta)
        .bind(floor)
        .fetch_optional(self.pool)
        .await?;

        Ok(updated.map(|(stock,)| stock))
    }
}
