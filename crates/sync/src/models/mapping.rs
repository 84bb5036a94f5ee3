//! Sync mapping entry: the authoritative local record of remote identity.
//!
//! One row per local product that has ever been sent to the channel. The
//! reconciler consults this table - never a remote search - to decide
//! create-vs-update, which keeps repeated syncs from creating duplicate
//! remote entities even though SKUs are shared across a parent and its
//! variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrine_core::{ProductId, SyncShape};

/// Outcome of the most recent sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Ok,
    Error,
}

impl SyncOutcome {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for SyncOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "error" => Ok(Self::Error),
            _ => Err(format!("invalid sync outcome: {s}")),
        }
    }
}

/// Last-known values of the fields tracked by the divergence detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFields {
    pub category: Option<String>,
    pub group: Option<String>,
    pub subgroup: Option<String>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub height: Option<Decimal>,
    pub width: Option<Decimal>,
    pub depth: Option<Decimal>,
}

impl TrackedFields {
    /// Capture the tracked fields from a local product.
    #[must_use]
    pub fn capture(product: &super::LocalProduct) -> Self {
        Self {
            category: product.category.clone(),
            group: product.group.clone(),
            subgroup: product.subgroup.clone(),
            name: product.clean_description(),
            price: product.price,
            stock: product.stock,
            weight: product.weight,
            height: product.height,
            width: product.width,
            depth: product.depth,
        }
    }
}

/// One mapping row, keyed by local product ID.
///
/// Remote IDs are cleared - the row is kept - when the remote entity is
/// discovered missing, which lets the next sync re-create without losing
/// attempt history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Local product ID (primary key).
    pub product_id: ProductId,
    /// Catalog shape the product was last sent as.
    pub shape: SyncShape,
    /// Parent local product, for variants.
    pub parent_product_id: Option<ProductId>,
    /// SKU derived by the identity policy.
    pub sku: String,
    /// Barcode derived by the identity policy.
    pub barcode: Option<String>,
    /// Channel product ID, when known.
    pub remote_product_id: Option<String>,
    /// Channel variant ID, when known.
    pub remote_variant_id: Option<String>,
    /// Outcome of the most recent attempt.
    pub last_outcome: SyncOutcome,
    /// Error text from the most recent failed attempt.
    pub last_error: Option<String>,
    /// Total attempts recorded for this product.
    pub attempts: i32,
    /// Last successfully sent payload.
    pub snapshot: Option<serde_json::Value>,
    /// Whether the divergence detector flagged this product.
    pub needs_update: bool,
    /// Last-known values of the tracked comparison fields.
    pub tracked: TrackedFields,
    /// When the mapping was first written.
    pub created_at: DateTime<Utc>,
    /// When the mapping was last touched.
    pub updated_at: DateTime<Utc>,
}

impl MappingEntry {
    /// Whether this entry maps to a live remote product.
    #[must_use]
    pub const fn has_remote(&self) -> bool {
        self.remote_product_id.is_some()
    }
}
