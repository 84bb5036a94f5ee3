//! Type-aware divergence detection between current local values and the
//! last-sent snapshot.
//!
//! Parents compare taxonomy only (their numeric fields live on variants),
//! variants compare operational numbers only, standalone products compare
//! both. Price gets a small tolerance so floating rounding never flags a
//! product; every other number must match exactly.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{instrument, warn};

use vitrine_core::{ProductId, SyncShape};

use super::SyncError;
use crate::db::{MappingRepository, ProductRepository};
use crate::models::TrackedFields;
use crate::tenant::TenantContext;

/// One diverging field with both values, for human review.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldDivergence {
    pub field: &'static str,
    pub local: String,
    pub snapshot: String,
}

/// Ordered divergence report for one product.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DivergenceReport {
    fields: Vec<FieldDivergence>,
}

impl DivergenceReport {
    /// Whether any tracked field diverged; persisted as the
    /// `needs_update` flag.
    #[must_use]
    pub fn has_divergence(&self) -> bool {
        !self.fields.is_empty()
    }

    /// The diverging fields, in comparison order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDivergence] {
        &self.fields
    }

    /// Number of diverging fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the report is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Compare current local values against the snapshot for one shape.
#[must_use]
pub fn detect(
    shape: SyncShape,
    local: &TrackedFields,
    snapshot: &TrackedFields,
    price_tolerance: Decimal,
) -> DivergenceReport {
    let mut fields = Vec::new();

    if shape.compares_taxonomy() {
        push_string(&mut fields, "category", &local.category, &snapshot.category);
        push_string(&mut fields, "group", &local.group, &snapshot.group);
        push_string(&mut fields, "subgroup", &local.subgroup, &snapshot.subgroup);
    }

    if shape.compares_operational() {
        push_price(&mut fields, &local.price, &snapshot.price, price_tolerance);
        push_number(&mut fields, "stock", &local.stock, &snapshot.stock);
        push_number(&mut fields, "height", &local.height, &snapshot.height);
        push_number(&mut fields, "width", &local.width, &snapshot.width);
        push_number(&mut fields, "depth", &local.depth, &snapshot.depth);
        push_number(&mut fields, "weight", &local.weight, &snapshot.weight);
    }

    DivergenceReport { fields }
}

/// Aggregate result of a full divergence recheck.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecheckSummary {
    /// Entries newly (or still) flagged as needing an update.
    pub marked: usize,
    /// Entries whose flag was cleared.
    pub cleared: usize,
    /// Mapped products examined.
    pub total: usize,
    /// Per-item divergence counts.
    pub items: Vec<RecheckItem>,
}

/// Per-product entry in a [`RecheckSummary`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecheckItem {
    pub local_id: ProductId,
    pub divergences: usize,
}

/// Recompute divergence for every mapped product of the current tenant and
/// persist the `needs_update` flag.
///
/// # Errors
///
/// Returns `SyncError` when no tenant context is established or the
/// database fails; individual products that vanished locally are skipped
/// with a warning.
#[instrument(skip(price_tolerance))]
pub async fn recheck_all(price_tolerance: Decimal) -> Result<RecheckSummary, SyncError> {
    let ctx = TenantContext::current()?;
    let products = ProductRepository::new(ctx.pool());
    let mappings = MappingRepository::new(ctx.pool());

    let entries = mappings.list_all().await?;
    let mut summary = RecheckSummary {
        marked: 0,
        cleared: 0,
        total: 0,
        items: Vec::with_capacity(entries.len()),
    };

    for entry in entries {
        let Some(product) = products.get(entry.product_id).await? else {
            warn!(product_id = %entry.product_id,
                  "Mapped product no longer exists locally; skipping recheck");
            continue;
        };

        let current = TrackedFields::capture(&product);
        let report = detect(entry.shape, &current, &entry.tracked, price_tolerance);
        let has_divergence = report.has_divergence();

        mappings
            .set_needs_update(entry.product_id, has_divergence)
            .await?;

        summary.total += 1;
        if has_divergence {
            summary.marked += 1;
        } else if entry.needs_update {
            summary.cleared += 1;
        }
        summary.items.push(RecheckItem {
            local_id: entry.product_id,
            divergences: report.len(),
        });
    }

    Ok(summary)
}

/// Parse a number the way back-office data actually arrives: decimal comma,
/// thousands separators, or blank (meaning zero).
#[must_use]
pub fn parse_flexible(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(Decimal::ZERO);
    }

    let normalized = if trimmed.contains(',') {
        // "1.234,56" -> "1234.56"
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    normalized.parse().ok()
}

/// Strings compare with null normalized to empty.
fn push_string(
    fields: &mut Vec<FieldDivergence>,
    field: &'static str,
    local: &Option<String>,
    snapshot: &Option<String>,
) {
    let l = local.as_deref().unwrap_or_default();
    let s = snapshot.as_deref().unwrap_or_default();
    if l != s {
        fields.push(FieldDivergence {
            field,
            local: l.to_string(),
            snapshot: s.to_string(),
        });
    }
}

/// Numbers compare exactly, with blank coerced to zero.
fn push_number(
    fields: &mut Vec<FieldDivergence>,
    field: &'static str,
    local: &Option<Decimal>,
    snapshot: &Option<Decimal>,
) {
    let l = local.unwrap_or_default();
    let s = snapshot.unwrap_or_default();
    if l != s {
        fields.push(FieldDivergence {
            field,
            local: l.to_string(),
            snapshot: s.to_string(),
        });
    }
}

/// Price compares within the configured tolerance.
fn push_price(
    fields: &mut Vec<FieldDivergence>,
    local: &Option<Decimal>,
    snapshot: &Option<Decimal>,
    tolerance: Decimal,
) {
    let l = local.unwrap_or_default();
    let s = snapshot.unwrap_or_default();
    if (l - s).abs() > tolerance {
        fields.push(FieldDivergence {
            field: "price",
            local: l.to_string(),
            snapshot: s.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: Decimal = Decimal::from_parts(10, 0, 0, false, 2); // 0.10

    fn tracked(price: &str, category: &str) -> TrackedFields {
        TrackedFields {
            category: Some(category.to_string()),
            group: None,
            subgroup: None,
            name: None,
            price: Some(price.parse().expect("price")),
            stock: Some(Decimal::ONE),
            weight: None,
            height: None,
            width: None,
            depth: None,
        }
    }

    #[test]
    fn test_parent_ignores_price_changes() {
        let local = tracked("19.90", "100");
        let snapshot = tracked("12.00", "100");

        let report = detect(SyncShape::Parent, &local, &snapshot, TOLERANCE);
        assert!(!report.has_divergence());
    }

    #[test]
    fn test_variant_reports_price_change() {
        let local = tracked("19.90", "100");
        let snapshot = tracked("12.00", "100");

        let report = detect(SyncShape::Variant, &local, &snapshot, TOLERANCE);
        assert_eq!(report.len(), 1);
        assert_eq!(report.fields()[0].field, "price");
    }

    #[test]
    fn test_variant_ignores_category_changes() {
        let local = tracked("19.90", "200");
        let snapshot = tracked("19.90", "100");

        let report = detect(SyncShape::Variant, &local, &snapshot, TOLERANCE);
        assert!(!report.has_divergence());
    }

    #[test]
    fn test_standalone_compares_both_sets() {
        let local = tracked("19.90", "200");
        let snapshot = tracked("12.00", "100");

        let report = detect(SyncShape::Standalone, &local, &snapshot, TOLERANCE);
        let fields: Vec<&str> = report.fields().iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["category", "price"]);
    }

    #[test]
    fn test_price_within_tolerance_is_not_divergence() {
        let local = tracked("19.95", "100");
        let snapshot = tracked("19.90", "100");

        let report = detect(SyncShape::Variant, &local, &snapshot, TOLERANCE);
        assert!(!report.has_divergence());
    }

    #[test]
    fn test_price_beyond_tolerance_is_divergence() {
        let local = tracked("20.40", "100");
        let snapshot = tracked("19.90", "100");

        let report = detect(SyncShape::Variant, &local, &snapshot, TOLERANCE);
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_stock_requires_exact_equality() {
        let mut local = tracked("19.90", "100");
        let snapshot = tracked("19.90", "100");
        local.stock = Some("1.05".parse().expect("stock"));

        let report = detect(SyncShape::Variant, &local, &snapshot, TOLERANCE);
        assert_eq!(report.fields()[0].field, "stock");
    }

    #[test]
    fn test_blank_numbers_coerce_to_zero() {
        let mut local = tracked("19.90", "100");
        let mut snapshot = tracked("19.90", "100");
        local.weight = None;
        snapshot.weight = Some(Decimal::ZERO);

        let report = detect(SyncShape::Variant, &local, &snapshot, TOLERANCE);
        assert!(!report.has_divergence());
    }

    #[test]
    fn test_null_strings_normalize_to_empty() {
        let mut local = tracked("19.90", "100");
        let mut snapshot = tracked("19.90", "100");
        local.group = None;
        snapshot.group = Some(String::new());

        let report = detect(SyncShape::Standalone, &local, &snapshot, TOLERANCE);
        assert!(!report.has_divergence());
    }

    #[test]
    fn test_parse_flexible_decimal_comma() {
        assert_eq!(parse_flexible("1.234,56"), Some("1234.56".parse().expect("d")));
        assert_eq!(parse_flexible("12,5"), Some("12.5".parse().expect("d")));
        assert_eq!(parse_flexible("1234.56"), Some("1234.56".parse().expect("d")));
        assert_eq!(parse_flexible(""), Some(Decimal::ZERO));
        assert_eq!(parse_flexible("  "), Some(Decimal::ZERO));
        assert_eq!(parse_flexible("abc"), None);
    }
}
