//! Outbound payload building and pre-flight validation.
//!
//! Validation runs before any remote call: a product that would be rejected
//! by the channel for missing local data is reported as a structured issue
//! list, never as a remote error.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use vitrine_core::ProductId;

use super::classify::AttributeMatrix;
use super::identity::{
    SellableIdentity, parent_identity, standalone_identity, variant_identity,
};
use crate::channel::types::{ImagePayload, ProductPayload, VariantPayload};
use crate::models::{GradeDeclaration, LocalProduct};

/// One pre-flight validation finding.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub reason: String,
}

impl ValidationIssue {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// A fully built outbound product, ready for the reconciler.
#[derive(Debug, Clone)]
pub struct OutboundProduct {
    /// The payload sent on creation (variants and images included).
    pub payload: ProductPayload,
    /// Product-level identity (standalone or parent).
    pub identity: SellableIdentity,
    /// Declared variants in declaration order; empty for standalone products.
    pub variants: Vec<OutboundVariant>,
}

/// One declared variant, paired with its local row.
#[derive(Debug, Clone)]
pub struct OutboundVariant {
    pub product_id: ProductId,
    pub identity: SellableIdentity,
    pub payload: VariantPayload,
}

/// Build the outbound payload for a product and its declared variants.
///
/// `variants` pairs each declaration with its variant product, in
/// declaration order.
///
/// # Errors
///
/// Returns the full list of validation issues when the local data fails
/// pre-flight checks; no remote call may be made in that case.
pub fn build_outbound(
    product: &LocalProduct,
    variants: &[(GradeDeclaration, LocalProduct)],
    publish: bool,
) -> Result<OutboundProduct, Vec<ValidationIssue>> {
    let issues = validate(product, variants);
    if !issues.is_empty() {
        return Err(issues);
    }

    let name = product
        .clean_description()
        .unwrap_or_default();
    let categories = categories_of(product);
    let images = product
        .image_urls
        .iter()
        .enumerate()
        .map(|(i, src)| ImagePayload {
            src: src.clone(),
            position: i32::try_from(i).unwrap_or(i32::MAX).saturating_add(1),
        })
        .collect();

    if variants.is_empty() {
        let identity = standalone_identity(product);
        let variant = VariantPayload {
            sku: identity.sku.clone(),
            barcode: identity.barcode.clone(),
            price: product.price.unwrap_or_default(),
            stock: product.stock.unwrap_or_default(),
            weight: product.weight,
            height: product.height,
            width: product.width,
            depth: product.depth,
            values: vec![],
        };

        return Ok(OutboundProduct {
            payload: ProductPayload {
                handle: Some(slugify(&name)),
                name,
                description: product.clean_description(),
                published: publish,
                categories,
                attributes: vec![],
                variants: vec![variant],
                images,
            },
            identity,
            variants: vec![],
        });
    }

    let descriptions: HashMap<ProductId, String> = variants
        .iter()
        .filter_map(|(g, v)| v.clean_description().map(|d| (g.variant_id, d)))
        .collect();
    let grades: Vec<GradeDeclaration> = variants.iter().map(|(g, _)| g.clone()).collect();
    let matrix = AttributeMatrix::build(&grades, &descriptions);

    let identity = parent_identity(product);
    let outbound_variants: Vec<OutboundVariant> = variants
        .iter()
        .map(|(grade, variant)| {
            let variant_id = grade.variant_id;
            let v_identity = variant_identity(&identity, variant);
            let value = matrix
                .value_for(variant_id)
                .unwrap_or(super::classify::DEFAULT_VALUE_LABEL)
                .to_string();
            OutboundVariant {
                product_id: variant_id,
                payload: VariantPayload {
                    sku: v_identity.sku.clone(),
                    barcode: v_identity.barcode.clone(),
                    price: variant.price.unwrap_or_default(),
                    stock: variant.stock.unwrap_or_default(),
                    weight: variant.weight,
                    height: variant.height,
                    width: variant.width,
                    depth: variant.depth,
                    values: vec![value],
                },
                identity: v_identity,
            }
        })
        .collect();

    Ok(OutboundProduct {
        payload: ProductPayload {
            handle: Some(slugify(&name)),
            name,
            description: product.clean_description(),
            published: publish,
            categories,
            attributes: vec![matrix.name().to_string()],
            variants: outbound_variants.iter().map(|v| v.payload.clone()).collect(),
            images,
        },
        identity,
        variants: outbound_variants,
    })
}

/// Pre-flight validation of a product and its declared variants.
#[must_use]
pub fn validate(
    product: &LocalProduct,
    variants: &[(GradeDeclaration, LocalProduct)],
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if product.clean_description().is_none() {
        issues.push(ValidationIssue::new("description", "description is missing"));
    }

    if variants.is_empty() {
        validate_sellable(product, None, &mut issues);
    } else {
        for (grade, variant) in variants {
            validate_sellable(variant, Some(grade.variant_id), &mut issues);
        }
    }

    issues
}

fn validate_sellable(
    product: &LocalProduct,
    variant_id: Option<ProductId>,
    issues: &mut Vec<ValidationIssue>,
) {
    let context = variant_id.map_or_else(String::new, |id| format!(" (variant {id})"));

    match product.price {
        None => issues.push(ValidationIssue::new(
            "price",
            format!("price is missing{context}"),
        )),
        Some(price) if price <= Decimal::ZERO => issues.push(ValidationIssue::new(
            "price",
            format!("price must be positive{context}"),
        )),
        Some(_) => {}
    }

    if product.stock.is_none() {
        issues.push(ValidationIssue::new(
            "stock",
            format!("stock quantity is missing{context}"),
        ));
    }
}

fn categories_of(product: &LocalProduct) -> Vec<String> {
    [&product.category, &product.group, &product.subgroup]
        .into_iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// URL-safe handle derived from the product name.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vitrine_core::GradeId;

    fn product(id: i64, gtin: Option<&str>, price: Option<&str>, stock: Option<&str>) -> LocalProduct {
        LocalProduct {
            id: ProductId::new(id),
            description: Some(format!("Product {id}")),
            gtin: gtin.map(ToString::to_string),
            price: price.map(|p| p.parse().expect("price")),
            stock: stock.map(|s| s.parse().expect("stock")),
            weight: None,
            height: None,
            width: None,
            depth: None,
            category: Some("100".to_string()),
            group: None,
            subgroup: None,
            image_urls: vec![],
            channel_tag: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn grade(id: i64, parent: i64, variant: i64, value: &str) -> GradeDeclaration {
        GradeDeclaration {
            id: GradeId::new(id),
            parent_id: ProductId::new(parent),
            variant_id: ProductId::new(variant),
            axis_name: Some("Size".to_string()),
            axis_value: Some(value.to_string()),
            position: i32::try_from(id).unwrap_or(0),
        }
    }

    #[test]
    fn test_validation_catches_all_issues_before_any_remote_call() {
        let mut p = product(1, None, None, None);
        p.description = Some("  ".to_string());

        let issues = validate(&p, &[]);
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["description", "price", "stock"]);
    }

    #[test]
    fn test_validation_rejects_non_positive_price() {
        let p = product(1, None, Some("0"), Some("5"));
        let issues = validate(&p, &[]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "price");
    }

    #[test]
    fn test_validation_covers_each_variant() {
        let parent = product(1, None, Some("10"), Some("1"));
        let variants = vec![
            (grade(1, 1, 10, "M"), product(10, None, Some("10"), Some("1"))),
            (grade(2, 1, 11, "L"), product(11, None, None, Some("1"))),
        ];
        let issues = validate(&parent, &variants);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].reason.contains("variant 11"));
    }

    #[test]
    fn test_standalone_payload_has_one_implicit_variant() {
        let p = product(1, Some("7891234567895"), Some("19.90"), Some("3"));
        let outbound = build_outbound(&p, &[], true).expect("valid");

        assert!(outbound.variants.is_empty());
        assert_eq!(outbound.payload.variants.len(), 1);
        assert_eq!(outbound.payload.variants[0].sku, "7891234567895");
        assert!(outbound.payload.attributes.is_empty());
    }

    #[test]
    fn test_every_variant_inherits_parent_sku() {
        let parent = product(1, None, Some("10"), Some("1"));
        let variants = vec![
            (
                grade(1, 1, 10, "M"),
                product(10, Some("7891234567901"), Some("10"), Some("1")),
            ),
            (
                grade(2, 1, 11, "L"),
                product(11, Some("7891234567902"), Some("10"), Some("1")),
            ),
        ];
        let outbound = build_outbound(&parent, &variants, true).expect("valid");

        for variant in &outbound.variants {
            assert_eq!(variant.payload.sku, outbound.identity.sku);
        }
        // Only barcodes differ per variant.
        assert_eq!(
            outbound.variants[0].payload.barcode.as_deref(),
            Some("7891234567901")
        );
        assert_eq!(
            outbound.variants[1].payload.barcode.as_deref(),
            Some("7891234567902")
        );
    }

    #[test]
    fn test_attribute_matrix_consistency() {
        let parent = product(1, None, Some("10"), Some("1"));
        let variants = vec![
            (grade(1, 1, 10, "M"), product(10, None, Some("10"), Some("1"))),
            (grade(2, 1, 11, "L"), product(11, None, Some("10"), Some("1"))),
        ];
        let outbound = build_outbound(&parent, &variants, true).expect("valid");

        // One declared attribute, and every variant carries exactly one value
        // aligned with it.
        assert_eq!(outbound.payload.attributes, vec!["Size".to_string()]);
        for variant in &outbound.payload.variants {
            assert_eq!(variant.values.len(), 1);
        }
        assert_eq!(outbound.payload.variants[0].values[0], "M");
        assert_eq!(outbound.payload.variants[1].values[0], "L");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Camiseta Azul  P"), "camiseta-azul-p");
        assert_eq!(slugify("  --  "), "");
    }

    #[test]
    fn test_images_are_positioned_in_order() {
        let mut p = product(1, None, Some("10"), Some("1"));
        p.image_urls = vec![
            "https://img.example/a.jpg".to_string(),
            "https://img.example/b.jpg".to_string(),
        ];
        let outbound = build_outbound(&p, &[], true).expect("valid");
        assert_eq!(outbound.payload.images[0].position, 1);
        assert_eq!(outbound.payload.images[1].position, 2);
    }
}
