//! Database operations for mirrored channel orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use vitrine_core::{ChannelOrderId, OrderLineId, ProductId};

use super::RepositoryError;
use crate::models::{ChannelOrder, ChannelOrderLine, NewOrderLine};

/// Internal row type for order header queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    platform: String,
    remote_order_id: i64,
    status: String,
    payment_status: String,
    customer_name: Option<String>,
    customer_email: Option<String>,
    total: Option<Decimal>,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for ChannelOrder {
    fn from(row: OrderRow) -> Self {
        Self {
            id: ChannelOrderId::new(row.id),
            platform: row.platform,
            remote_order_id: row.remote_order_id,
            status: row.status,
            payment_status: row.payment_status,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            total: row.total,
            processed_at: row.processed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for order line queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i64,
    order_id: i64,
    product_id: Option<i64>,
    sku: Option<String>,
    barcode: Option<String>,
    remote_variant_id: Option<String>,
    description: Option<String>,
    quantity: Decimal,
    unit_price: Option<Decimal>,
}

impl From<OrderLineRow> for ChannelOrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: OrderLineId::new(row.id),
            order_id: ChannelOrderId::new(row.order_id),
            product_id: row.product_id.map(ProductId::new),
            sku: row.sku,
            barcode: row.barcode,
            remote_variant_id: row.remote_variant_id,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

const ORDER_COLUMNS: &str = "id, platform, remote_order_id, status, payment_status, \
                             customer_name, customer_email, total, processed_at, \
                             created_at, updated_at";

/// Input for upserting an order header.
#[derive(Debug, Clone)]
pub struct UpsertOrder<'a> {
    pub platform: &'a str,
    pub remote_order_id: i64,
    pub status: &'a str,
    pub payment_status: &'a str,
    pub customer_name: Option<&'a str>,
    pub customer_email: Option<&'a str>,
    pub total: Option<Decimal>,
}

/// Repository for channel order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order header by its channel identity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_remote(
        &self,
        platform: &str,
        remote_order_id: i64,
    ) -> Result<Option<ChannelOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM channel_orders \
             WHERE platform = $1 AND remote_order_id = $2"
        ))
        .bind(platform)
        .bind(remote_order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Upsert an order header by (platform, remote order id).
    ///
    /// The `processed_at` gate is deliberately left out of the update set: a
    /// re-delivery must never reset the idempotency state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_header(
        &self,
        input: &UpsertOrder<'_>,
    ) -> Result<ChannelOrder, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO channel_orders ( \
                 platform, remote_order_id, status, payment_status, \
                 customer_name, customer_email, total \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (platform, remote_order_id) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 payment_status = EXCLUDED.payment_status, \
                 customer_name = EXCLUDED.customer_name, \
                 customer_email = EXCLUDED.customer_email, \
                 total = EXCLUDED.total, \
                 updated_at = now() \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(input.platform)
        .bind(input.remote_order_id)
        .bind(input.status)
        .bind(input.payment_status)
        .bind(input.customer_name)
        .bind(input.customer_email)
        .bind(input.total)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace all lines of an order (delete then reinsert).
    ///
    /// Runs inside a single transaction so a concurrent reader never sees an
    /// order with zero lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn replace_lines(
        &self,
        order_id: ChannelOrderId,
        lines: &[NewOrderLine],
    ) -> Result<Vec<ChannelOrderLine>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM channel_order_lines WHERE order_id = $1")
            .bind(order_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let mut inserted = Vec::with_capacity(lines.len());
        for line in lines {
            let row = sqlx::query_as::<_, OrderLineRow>(
                "INSERT INTO channel_order_lines ( \
                     order_id, product_id, sku, barcode, remote_variant_id, \
                     description, quantity, unit_price \
                 ) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING id, order_id, product_id, sku, barcode, remote_variant_id, \
                           description, quantity, unit_price",
            )
            .bind(order_id.as_i64())
            .bind(line.product_id.map(|p| p.as_i64()))
            .bind(&line.sku)
            .bind(&line.barcode)
            .bind(&line.remote_variant_id)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row.into());
        }

        tx.commit().await?;

        Ok(inserted)
    }

    /// All lines of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_lines(
        &self,
        order_id: ChannelOrderId,
    ) -> Result<Vec<ChannelOrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            "SELECT id, order_id, product_id, sku, barcode, remote_variant_id, \
                    description, quantity, unit_price \
             FROM channel_order_lines \
             WHERE order_id = $1 \
             ORDER BY id ASC",
        )
        .bind(order_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Flip the processed gate.
    ///
    /// `processed = true` stamps `processed_at = now()`; `false` clears it
    /// (revert after cancellation).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_processed(
        &self,
        order_id: ChannelOrderId,
        processed: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE channel_orders \
             SET processed_at = CASE WHEN $2 THEN now() ELSE NULL END, updated_at = now() \
             WHERE id = $1",
        )
        .bind(order_id.as_i64())
        .bind(processed)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
