//! Local product and variant declaration models.
//!
//! The local product table is the system of record, maintained by ordinary
//! back-office CRUD. The sync engine reads it and writes back exactly two
//! things: the channel tag (reconciler) and stock (order processor, through
//! an atomic clamped update).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrine_core::{GradeId, ProductId};

/// A local product row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalProduct {
    /// Internal product ID.
    pub id: ProductId,
    /// Product description (doubles as the channel-facing name).
    pub description: Option<String>,
    /// GTIN/EAN barcode, when assigned.
    pub gtin: Option<String>,
    /// Sale price.
    pub price: Option<Decimal>,
    /// Stock on hand.
    pub stock: Option<Decimal>,
    /// Shipping weight (kg).
    pub weight: Option<Decimal>,
    /// Package height (cm).
    pub height: Option<Decimal>,
    /// Package width (cm).
    pub width: Option<Decimal>,
    /// Package depth (cm).
    pub depth: Option<Decimal>,
    /// Resolved channel category ID.
    pub category: Option<String>,
    /// Resolved channel group ID.
    pub group: Option<String>,
    /// Resolved channel subgroup ID.
    pub subgroup: Option<String>,
    /// Image URLs to publish with the product.
    pub image_urls: Vec<String>,
    /// Single-character summary of the current sync shape
    /// (`S`/`P`/`V`, `None` when never synced).
    pub channel_tag: Option<String>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl LocalProduct {
    /// Trimmed, non-empty GTIN, if any.
    #[must_use]
    pub fn clean_gtin(&self) -> Option<String> {
        self.gtin
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(ToString::to_string)
    }

    /// Trimmed, non-empty description, if any.
    #[must_use]
    pub fn clean_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToString::to_string)
    }
}

/// A variant declaration: one row stating that `variant_id` is a variant of
/// `parent_id` along a free-text variation axis.
///
/// Ordering (`position`, then id) is significant for attribute-matrix
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeDeclaration {
    /// Declaration row ID.
    pub id: GradeId,
    /// The parent product.
    pub parent_id: ProductId,
    /// The product bound as a variant.
    pub variant_id: ProductId,
    /// Variation axis name (e.g. "Size"). Free text, may be blank.
    pub axis_name: Option<String>,
    /// Characteristic value for this variant (e.g. "M"). Free text, may be blank.
    pub axis_value: Option<String>,
    /// Ordering within the parent's variant list.
    pub position: i32,
}
