//! Local mirror of channel orders.
//!
//! The header is upserted by (platform, remote order id); lines are fully
//! replaced on every delivery. `processed_at` is the sole idempotency gate
//! for inventory application.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrine_core::{ChannelOrderId, OrderLineId, ProductId};

/// A mirrored channel order header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelOrder {
    /// Local row ID.
    pub id: ChannelOrderId,
    /// Platform the order came from.
    pub platform: String,
    /// Remote order ID (unique per platform).
    pub remote_order_id: i64,
    /// Normalized order status (lower case).
    pub status: String,
    /// Normalized payment status (lower case; forced to `cancelled` when the
    /// order is cancelled).
    pub payment_status: String,
    /// Customer display name.
    pub customer_name: Option<String>,
    /// Customer email.
    pub customer_email: Option<String>,
    /// Order total.
    pub total: Option<Decimal>,
    /// When inventory was debited for this order; `None` when not processed.
    pub processed_at: Option<DateTime<Utc>>,
    /// When the mirror row was created.
    pub created_at: DateTime<Utc>,
    /// When the mirror row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ChannelOrder {
    /// Whether inventory has been debited for this order.
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}

/// A mirrored order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelOrderLine {
    /// Local row ID.
    pub id: OrderLineId,
    /// Owning order header.
    pub order_id: ChannelOrderId,
    /// Local product, resolved via barcode/GTIN only. `None` when no local
    /// product carries the line's barcode.
    pub product_id: Option<ProductId>,
    /// Remote SKU as delivered (not trusted for resolution).
    pub sku: Option<String>,
    /// Remote barcode as delivered.
    pub barcode: Option<String>,
    /// Remote variant ID as delivered (not trusted for resolution).
    pub remote_variant_id: Option<String>,
    /// Line description.
    pub description: Option<String>,
    /// Ordered quantity.
    pub quantity: Decimal,
    /// Unit price.
    pub unit_price: Option<Decimal>,
}

/// Input for inserting a replacement set of order lines.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    /// Local product resolved via barcode, if any.
    pub product_id: Option<ProductId>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub remote_variant_id: Option<String>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
}
