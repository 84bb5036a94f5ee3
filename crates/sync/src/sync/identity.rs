//! Deterministic SKU/barcode derivation.
//!
//! Pure functions of the local row, its shape, and (for variants) the
//! parent's identity. Repeated syncs must derive byte-identical identifiers
//! or unchanged products would perturb remote state.
//!
//! Variants always inherit the parent's SKU - intentionally, so the channel
//! groups the family - and differ only by barcode.

use crate::models::LocalProduct;

/// Prefix for SKUs synthesized from the internal product ID.
const SYNTHESIZED_SKU_PREFIX: &str = "INT-";

/// The identifiers sent to the channel for one sellable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellableIdentity {
    pub sku: String,
    pub barcode: Option<String>,
}

/// Identity for a standalone product: own GTIN (or synthesized SKU) and own
/// barcode.
#[must_use]
pub fn standalone_identity(product: &LocalProduct) -> SellableIdentity {
    let gtin = product.clean_gtin();
    SellableIdentity {
        sku: gtin.clone().unwrap_or_else(|| synthesized_sku(product)),
        barcode: gtin,
    }
}

/// Identity for a parent product: own GTIN or synthesized SKU, no barcode
/// (parents are not sellable units themselves).
#[must_use]
pub fn parent_identity(product: &LocalProduct) -> SellableIdentity {
    SellableIdentity {
        sku: product
            .clean_gtin()
            .unwrap_or_else(|| synthesized_sku(product)),
        barcode: None,
    }
}

/// Identity for a variant: the parent's SKU, the variant's own barcode.
#[must_use]
pub fn variant_identity(parent: &SellableIdentity, variant: &LocalProduct) -> SellableIdentity {
    SellableIdentity {
        sku: parent.sku.clone(),
        barcode: variant.clean_gtin(),
    }
}

fn synthesized_sku(product: &LocalProduct) -> String {
    format!("{SYNTHESIZED_SKU_PREFIX}{}", product.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vitrine_core::ProductId;

    fn product(id: i64, gtin: Option<&str>) -> LocalProduct {
        LocalProduct {
            id: ProductId::new(id),
            description: Some("Test product".to_string()),
            gtin: gtin.map(ToString::to_string),
            price: None,
            stock: None,
            weight: None,
            height: None,
            width: None,
            depth: None,
            category: None,
            group: None,
            subgroup: None,
            image_urls: vec![],
            channel_tag: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_standalone_uses_gtin_when_present() {
        let identity = standalone_identity(&product(1, Some("7891234567895")));
        assert_eq!(identity.sku, "7891234567895");
        assert_eq!(identity.barcode.as_deref(), Some("7891234567895"));
    }

    #[test]
    fn test_standalone_synthesizes_sku_without_gtin() {
        let identity = standalone_identity(&product(42, None));
        assert_eq!(identity.sku, "INT-42");
        assert_eq!(identity.barcode, None);
    }

    #[test]
    fn test_blank_gtin_treated_as_absent() {
        let identity = standalone_identity(&product(42, Some("   ")));
        assert_eq!(identity.sku, "INT-42");
        assert_eq!(identity.barcode, None);
    }

    #[test]
    fn test_parent_has_no_barcode() {
        let identity = parent_identity(&product(7, Some("7891234567895")));
        assert_eq!(identity.sku, "7891234567895");
        assert_eq!(identity.barcode, None);
    }

    #[test]
    fn test_variant_inherits_parent_sku() {
        let parent = parent_identity(&product(7, None));
        let identity = variant_identity(&parent, &product(8, Some("7891234567901")));
        assert_eq!(identity.sku, "INT-7");
        assert_eq!(identity.barcode.as_deref(), Some("7891234567901"));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let p = product(9, Some("7891234567895"));
        assert_eq!(standalone_identity(&p), standalone_identity(&p));
    }
}
