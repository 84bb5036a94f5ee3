//! Mapping-aware upsert reconciler.
//!
//! The defining property: the local mapping table is the single source of
//! truth for "does a remote entity already exist for this local product",
//! never a remote search. Searching the channel by SKU is ambiguous once
//! SKUs are shared between parents and variants, and racy under concurrent
//! syncs.

use serde::Serialize;
use tracing::{instrument, warn};

use vitrine_core::{ProductId, SyncShape};

use super::SyncError;
use super::payload::{OutboundProduct, OutboundVariant, ValidationIssue, build_outbound};
use crate::channel::ChannelClient;
use crate::channel::ChannelError;
use crate::channel::types::{ProductUpdatePayload, RemoteProduct, RemoteVariant};
use crate::db::mappings::{RecordFailure, RecordSuccess};
use crate::db::{MappingRepository, ProductRepository};
use crate::models::{GradeDeclaration, LocalProduct, TrackedFields};
use crate::tenant::TenantContext;

/// What the reconciler did for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
}

/// Per-item result of a reconciliation trigger.
///
/// A batch never fails because one item failed; every requested ID comes
/// back as one of these.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub local_id: ProductId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<SyncAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<ValidationIssue>>,
}

impl ItemOutcome {
    fn success(local_id: ProductId, action: SyncAction, remote_product_id: String) -> Self {
        Self {
            local_id,
            ok: true,
            action: Some(action),
            remote_product_id: Some(remote_product_id),
            error: None,
            issues: None,
        }
    }

    fn failure(local_id: ProductId, error: impl Into<String>) -> Self {
        Self {
            local_id,
            ok: false,
            action: None,
            remote_product_id: None,
            error: Some(error.into()),
            issues: None,
        }
    }

    fn invalid(local_id: ProductId, issues: Vec<ValidationIssue>) -> Self {
        Self {
            local_id,
            ok: false,
            action: None,
            remote_product_id: None,
            error: Some("validation failed".to_string()),
            issues: Some(issues),
        }
    }
}

/// The reconciler. Cheap to construct per request.
pub struct Reconciler<'a> {
    channel: &'a ChannelClient,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over the given channel client.
    #[must_use]
    pub const fn new(channel: &'a ChannelClient) -> Self {
        Self { channel }
    }

    /// Reconcile a batch of products, isolating failures per item.
    pub async fn sync_many(&self, ids: &[ProductId], publish: Option<bool>) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for &id in ids {
            let outcome = match self.sync_product(id, publish).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(product_id = %id, error = %e, "Product sync failed");
                    ItemOutcome::failure(id, e.to_string())
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Reconcile one product (and, for parents, its declared variants).
    ///
    /// # Errors
    ///
    /// Returns `SyncError` for failures that precede the outcome decision
    /// (missing context, missing product, remote fetch failure). Validation
    /// failures and remote write failures are reported inside the returned
    /// [`ItemOutcome`].
    #[instrument(skip(self, publish), fields(product_id = %id))]
    pub async fn sync_product(
        &self,
        id: ProductId,
        publish: Option<bool>,
    ) -> Result<ItemOutcome, SyncError> {
        let ctx = TenantContext::current()?;
        let products = ProductRepository::new(ctx.pool());
        let mappings = MappingRepository::new(ctx.pool());

        let product = products.get(id).await?.ok_or(SyncError::ProductNotFound(id))?;

        if let Some(parent) = products.parent_of(id).await? {
            return Err(SyncError::IsVariant {
                product: id,
                parent,
            });
        }

        let grades = products.grades_for(id).await?;
        let variants = self.load_variants(&products, &grades).await?;

        let outbound = match build_outbound(&product, &variants, publish.unwrap_or(true)) {
            Ok(outbound) => outbound,
            Err(issues) => return Ok(ItemOutcome::invalid(id, issues)),
        };
        let shape = if outbound.variants.is_empty() {
            SyncShape::Standalone
        } else {
            SyncShape::Parent
        };

        // The mapping entry - never a remote search - decides create vs update.
        let mapping = mappings.get(id).await?;
        let mapped_remote_id = mapping.as_ref().and_then(|m| m.remote_product_id.clone());

        if let Some(remote_id) = mapped_remote_id {
            match self.channel.get_product(&remote_id).await {
                Ok(Some(remote)) => {
                    return self
                        .update_existing(&ctx, &product, &variants, &outbound, shape, remote)
                        .await;
                }
                Ok(None) => {
                    // Self-heal: the remote entity is gone. Clear the remote
                    // identifiers (keeping the row and its history) and fall
                    // through to creation.
                    warn!(product_id = %id, remote_product_id = %remote_id,
                          "Mapped remote product vanished; remapping");
                    mappings.clear_remote_ids(id).await?;
                }
                // Anything but a clean 404 leaves the mapping untouched.
                Err(e) => return Err(SyncError::Channel(e)),
            }
        }

        self.create_remote(&ctx, &product, &variants, &outbound, shape)
            .await
    }

    /// Load the variant products referenced by the declarations, preserving
    /// declaration order. Dangling declarations are skipped with a warning.
    async fn load_variants(
        &self,
        products: &ProductRepository<'_>,
        grades: &[GradeDeclaration],
    ) -> Result<Vec<(GradeDeclaration, LocalProduct)>, SyncError> {
        if grades.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = grades.iter().map(|g| g.variant_id).collect();
        let loaded = products.get_many(&ids).await?;

        let mut ordered = Vec::with_capacity(grades.len());
        for grade in grades {
            match loaded.iter().find(|p| p.id == grade.variant_id) {
                Some(product) => ordered.push((grade.clone(), product.clone())),
                None => warn!(
                    parent_id = %grade.parent_id,
                    variant_id = %grade.variant_id,
                    "Variant declaration points at a missing product; skipping"
                ),
            }
        }
        Ok(ordered)
    }

    /// Update path: the mapped remote product exists.
    ///
    /// Variants and images are deliberately not re-sent in the product call;
    /// both sub-resources are reconciled separately.
    async fn update_existing(
        &self,
        ctx: &TenantContext,
        product: &LocalProduct,
        variants: &[(GradeDeclaration, LocalProduct)],
        outbound: &OutboundProduct,
        shape: SyncShape,
        remote: RemoteProduct,
    ) -> Result<ItemOutcome, SyncError> {
        let products = ProductRepository::new(ctx.pool());
        let mappings = MappingRepository::new(ctx.pool());
        let update = ProductUpdatePayload::from(&outbound.payload);

        if let Err(e) = self.channel.update_product(&remote.id, &update).await {
            mappings
                .record_failure(&failure_record(product, outbound, shape, &e))
                .await?;
            return Ok(ItemOutcome::failure(product.id, e.to_string()));
        }

        self.reconcile_images(&remote.id, outbound).await;

        if shape == SyncShape::Parent {
            self.reconcile_variants(ctx, product.id, &remote.id, &remote.variants, variants, outbound)
                .await?;
        }

        let remote_variant_id = match shape {
            // A standalone product keeps its implicit variant's identity.
            SyncShape::Standalone => remote.variants.first().map(|v| v.id.clone()),
            _ => None,
        };

        mappings
            .record_success(&RecordSuccess {
                product_id: product.id,
                shape,
                parent_product_id: None,
                sku: outbound.identity.sku.clone(),
                barcode: outbound.identity.barcode.clone(),
                remote_product_id: remote.id.clone(),
                remote_variant_id,
                snapshot: serde_json::to_value(&outbound.payload)
                    .unwrap_or(serde_json::Value::Null),
                tracked: TrackedFields::capture(product),
            })
            .await?;
        products
            .set_channel_tag(product.id, Some(shape.tag()))
            .await?;

        Ok(ItemOutcome::success(
            product.id,
            SyncAction::Updated,
            remote.id,
        ))
    }

    /// Create path: no usable mapping exists.
    async fn create_remote(
        &self,
        ctx: &TenantContext,
        product: &LocalProduct,
        variants: &[(GradeDeclaration, LocalProduct)],
        outbound: &OutboundProduct,
        shape: SyncShape,
    ) -> Result<ItemOutcome, SyncError> {
        let products = ProductRepository::new(ctx.pool());
        let mappings = MappingRepository::new(ctx.pool());

        let remote = match self.channel.create_product(&outbound.payload).await {
            Ok(remote) => remote,
            Err(e) => {
                mappings
                    .record_failure(&failure_record(product, outbound, shape, &e))
                    .await?;
                return Ok(ItemOutcome::failure(product.id, e.to_string()));
            }
        };

        mappings
            .record_success(&RecordSuccess {
                product_id: product.id,
                shape,
                parent_product_id: None,
                sku: outbound.identity.sku.clone(),
                barcode: outbound.identity.barcode.clone(),
                remote_product_id: remote.id.clone(),
                remote_variant_id: remote.variants.first().map(|v| v.id.clone()),
                snapshot: serde_json::to_value(&outbound.payload)
                    .unwrap_or(serde_json::Value::Null),
                tracked: TrackedFields::capture(product),
            })
            .await?;
        products
            .set_channel_tag(product.id, Some(shape.tag()))
            .await?;

        if shape == SyncShape::Parent {
            self.reconcile_variants(ctx, product.id, &remote.id, &remote.variants, variants, outbound)
                .await?;
        }

        Ok(ItemOutcome::success(
            product.id,
            SyncAction::Created,
            remote.id,
        ))
    }

    /// Reconcile each declared variant independently.
    ///
    /// Existing remote variants are matched by barcode; matched ones are
    /// updated, unmatched ones created. Every variant's mapping entry is
    /// written on success and on failure, so one variant's failure never
    /// blocks the others.
    async fn reconcile_variants(
        &self,
        ctx: &TenantContext,
        parent_id: ProductId,
        remote_product_id: &str,
        remote_variants: &[RemoteVariant],
        variants: &[(GradeDeclaration, LocalProduct)],
        outbound: &OutboundProduct,
    ) -> Result<(), SyncError> {
        let products = ProductRepository::new(ctx.pool());
        let mappings = MappingRepository::new(ctx.pool());

        for outbound_variant in &outbound.variants {
            let Some((_, local_variant)) = variants
                .iter()
                .find(|(g, _)| g.variant_id == outbound_variant.product_id)
            else {
                continue;
            };

            let matched = match_variant(remote_variants, outbound_variant);
            let result = match matched {
                Some(existing) => self
                    .channel
                    .update_variant(remote_product_id, &existing.id, &outbound_variant.payload)
                    .await,
                None => self
                    .channel
                    .create_variant(remote_product_id, &outbound_variant.payload)
                    .await,
            };

            match result {
                Ok(remote_variant) => {
                    mappings
                        .record_success(&RecordSuccess {
                            product_id: outbound_variant.product_id,
                            shape: SyncShape::Variant,
                            parent_product_id: Some(parent_id),
                            sku: outbound_variant.identity.sku.clone(),
                            barcode: outbound_variant.identity.barcode.clone(),
                            remote_product_id: remote_product_id.to_string(),
                            remote_variant_id: Some(remote_variant.id),
                            snapshot: serde_json::to_value(&outbound_variant.payload)
                                .unwrap_or(serde_json::Value::Null),
                            tracked: TrackedFields::capture(local_variant),
                        })
                        .await?;
                    products
                        .set_channel_tag(outbound_variant.product_id, Some(SyncShape::Variant.tag()))
                        .await?;
                }
                Err(e) => {
                    warn!(
                        variant_id = %outbound_variant.product_id,
                        error = %e,
                        "Variant reconciliation failed; continuing with the rest"
                    );
                    mappings
                        .record_failure(&RecordFailure {
                            product_id: outbound_variant.product_id,
                            shape: SyncShape::Variant,
                            parent_product_id: Some(parent_id),
                            sku: outbound_variant.identity.sku.clone(),
                            barcode: outbound_variant.identity.barcode.clone(),
                            error: e.to_string(),
                        })
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// Best-effort image reconciliation: attach any local image the remote
    /// product does not already carry. Failures are logged, never fatal.
    async fn reconcile_images(&self, remote_product_id: &str, outbound: &OutboundProduct) {
        if outbound.payload.images.is_empty() {
            return;
        }

        let existing = match self.channel.list_images(remote_product_id).await {
            Ok(images) => images,
            Err(e) => {
                warn!(remote_product_id, error = %e, "Could not list remote images");
                return;
            }
        };

        for image in &outbound.payload.images {
            if existing.iter().any(|r| r.src == image.src) {
                continue;
            }
            if let Err(e) = self.channel.create_image(remote_product_id, image).await {
                warn!(remote_product_id, src = %image.src, error = %e,
                      "Could not attach image");
            }
        }
    }
}

/// Match a declared variant against the remote variant list by barcode.
///
/// Barcode is the only reliable key: every variant in the family shares the
/// parent's SKU.
fn match_variant<'r>(
    remote_variants: &'r [RemoteVariant],
    outbound: &OutboundVariant,
) -> Option<&'r RemoteVariant> {
    let barcode = outbound.payload.barcode.as_deref()?;
    remote_variants
        .iter()
        .find(|r| r.barcode.as_deref() == Some(barcode))
}

fn failure_record(
    product: &LocalProduct,
    outbound: &OutboundProduct,
    shape: SyncShape,
    error: &ChannelError,
) -> RecordFailure {
    RecordFailure {
        product_id: product.id,
        shape,
        parent_product_id: None,
        sku: outbound.identity.sku.clone(),
        barcode: outbound.identity.barcode.clone(),
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::types::VariantPayload;
    use crate::sync::identity::SellableIdentity;
    use rust_decimal::Decimal;

    fn outbound_variant(product_id: i64, barcode: Option<&str>) -> OutboundVariant {
        OutboundVariant {
            product_id: ProductId::new(product_id),
            identity: SellableIdentity {
                sku: "INT-1".to_string(),
                barcode: barcode.map(ToString::to_string),
            },
            payload: VariantPayload {
                sku: "INT-1".to_string(),
                barcode: barcode.map(ToString::to_string),
                price: Decimal::ONE,
                stock: Decimal::ONE,
                weight: None,
                height: None,
                width: None,
                depth: None,
                values: vec!["M".to_string()],
            },
        }
    }

    fn remote_variant(id: &str, sku: Option<&str>, barcode: Option<&str>) -> RemoteVariant {
        RemoteVariant {
            id: id.to_string(),
            sku: sku.map(ToString::to_string),
            barcode: barcode.map(ToString::to_string),
            price: None,
            stock: None,
        }
    }

    #[test]
    fn test_variants_match_by_barcode_never_by_sku() {
        let remote = vec![
            remote_variant("rv-1", Some("INT-1"), Some("7891234567901")),
            remote_variant("rv-2", Some("INT-1"), Some("7891234567902")),
        ];

        let matched = match_variant(&remote, &outbound_variant(10, Some("7891234567902")));
        assert_eq!(matched.map(|r| r.id.as_str()), Some("rv-2"));

        // Same SKU everywhere, unknown barcode: no match, even though every
        // remote variant carries the family SKU.
        let matched = match_variant(&remote, &outbound_variant(11, Some("0000000000000")));
        assert!(matched.is_none());
    }

    #[test]
    fn test_variant_without_barcode_never_matches() {
        let remote = vec![remote_variant("rv-1", Some("INT-1"), None)];
        let matched = match_variant(&remote, &outbound_variant(10, None));
        assert!(matched.is_none());
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let outcome = ItemOutcome::success(
            ProductId::new(5),
            SyncAction::Created,
            "rp-9".to_string(),
        );
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["localId"], 5);
        assert_eq!(json["ok"], true);
        assert_eq!(json["action"], "created");
        assert_eq!(json["remoteProductId"], "rp-9");
        assert!(json.get("error").is_none());
        assert!(json.get("issues").is_none());
    }
}
