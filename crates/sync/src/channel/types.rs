//! Wire types for the storefront channel REST API.
//!
//! Outbound payload structs serialize exactly what the channel accepts;
//! inbound remote structs are deserialization-tolerant (`#[serde(default)]`
//! on everything optional) because the channel adds fields without notice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Outbound payloads
// =============================================================================

/// Full product payload for creation (variants and images included).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub published: bool,
    /// Resolved channel category IDs.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub categories: Vec<String>,
    /// Declared variant attribute names. This integration supports exactly
    /// one attribute; every variant's `values` list aligns with it.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attributes: Vec<String>,
    pub variants: Vec<VariantPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub images: Vec<ImagePayload>,
}

/// Product-level update payload.
///
/// Deliberately carries no variants or images: those sub-resources are
/// reconciled separately because the channel rejects bulk sub-resource
/// replacement on update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductUpdatePayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub published: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attributes: Vec<String>,
}

impl From<&ProductPayload> for ProductUpdatePayload {
    fn from(payload: &ProductPayload) -> Self {
        Self {
            name: payload.name.clone(),
            description: payload.description.clone(),
            handle: payload.handle.clone(),
            published: payload.published,
            categories: payload.categories.clone(),
            attributes: payload.attributes.clone(),
        }
    }
}

/// One variant as sent to the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantPayload {
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub price: Decimal,
    pub stock: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<Decimal>,
    /// Attribute values, aligned with the parent's `attributes` list.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub values: Vec<String>,
}

/// One image as sent to the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImagePayload {
    pub src: String,
    pub position: i32,
}

/// Webhook subscription payload.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub event: String,
    pub url: String,
}

// =============================================================================
// Inbound remote entities
// =============================================================================

/// A product as returned by the channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub variants: Vec<RemoteVariant>,
}

/// A variant as returned by the channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVariant {
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<Decimal>,
}

/// An image as returned by the channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteImage {
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub position: i32,
}

/// A webhook subscription as returned by the channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteWebhook {
    pub id: String,
    pub event: String,
    pub url: String,
}

/// An order as returned by the channel.
///
/// Webhook payloads are not trusted to be complete; the processor always
/// fetches this full representation.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOrder {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub customer: Option<RemoteCustomer>,
    #[serde(default)]
    pub line_items: Vec<RemoteLineItem>,
}

/// Customer block on a remote order.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCustomer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One line item on a remote order.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLineItem {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_payload_drops_variants_and_images() {
        let payload = ProductPayload {
            name: "Shirt".to_string(),
            description: Some("A shirt".to_string()),
            handle: Some("shirt".to_string()),
            published: true,
            categories: vec!["10".to_string()],
            attributes: vec!["Size".to_string()],
            variants: vec![VariantPayload {
                sku: "INT-1".to_string(),
                barcode: Some("789000000001".to_string()),
                price: Decimal::new(9900, 2),
                stock: Decimal::new(5, 0),
                weight: None,
                height: None,
                width: None,
                depth: None,
                values: vec!["M".to_string()],
            }],
            images: vec![ImagePayload {
                src: "https://img.example/shirt.jpg".to_string(),
                position: 1,
            }],
        };

        let update = ProductUpdatePayload::from(&payload);
        let json = serde_json::to_value(&update).expect("serialize");
        assert!(json.get("variants").is_none());
        assert!(json.get("images").is_none());
        assert_eq!(json["name"], "Shirt");
    }

    #[test]
    fn test_remote_order_tolerates_missing_fields() {
        let order: RemoteOrder = serde_json::from_str(r#"{"id": 42}"#).expect("deserialize");
        assert_eq!(order.id, 42);
        assert!(order.line_items.is_empty());
        assert!(order.status.is_none());
    }

    #[test]
    fn test_variant_payload_serializes_price_as_string() {
        let variant = VariantPayload {
            sku: "INT-1".to_string(),
            barcode: None,
            price: Decimal::new(1250, 2),
            stock: Decimal::new(3, 0),
            weight: None,
            height: None,
            width: None,
            depth: None,
            values: vec![],
        };
        let json = serde_json::to_value(&variant).expect("serialize");
        // Decimal serializes as a string, keeping money exact on the wire.
        assert_eq!(json["price"], "12.50");
    }
}
