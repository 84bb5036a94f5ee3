//! Admin-invoked sync endpoints.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitrine_core::ProductId;

use crate::channel::types::WebhookPayload;
use crate::error::AppError;
use crate::models::{ExportQueueEntry, QueueOperation};
use crate::state::AppState;
use crate::sync::divergence::{self, RecheckSummary};
use crate::sync::reconciler::{ItemOutcome, Reconciler};
use crate::tenant::with_tenant;

/// Channel events the order webhook must be subscribed to.
const ORDER_WEBHOOK_EVENTS: [&str; 3] = ["order/created", "order/updated", "order/cancelled"];

/// Build the sync router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync/{tenant}/products", post(sync_products))
        .route("/sync/{tenant}/divergence/recheck", post(recheck_divergence))
        .route("/sync/{tenant}/queue", post(enqueue))
        .route("/sync/{tenant}/webhooks/ensure", post(ensure_webhooks))
}

/// One ID or a list - both spellings are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdSelector {
    One(i64),
    Many(Vec<i64>),
}

impl IdSelector {
    fn into_ids(self) -> Vec<ProductId> {
        match self {
            Self::One(id) => vec![ProductId::new(id)],
            Self::Many(ids) => ids.into_iter().map(ProductId::new).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest {
    ids: IdSelector,
    #[serde(default)]
    publish: Option<bool>,
}

/// POST /sync/{tenant}/products - reconcile one or more products.
///
/// Always returns one outcome per requested ID; a failing item never fails
/// the batch.
#[instrument(skip(state, request), fields(tenant = %tenant))]
async fn sync_products(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<Vec<ItemOutcome>>, AppError> {
    let ctx = super::tenant_scope(&state, &tenant).await?;
    let ids = request.ids.into_ids();

    let outcomes = with_tenant(ctx, async move {
        let reconciler = Reconciler::new(state.channel());
        reconciler.sync_many(&ids, request.publish).await
    })
    .await;

    Ok(Json(outcomes))
}

/// POST /sync/{tenant}/divergence/recheck - recompute divergence for all
/// mapped products and persist the `needs_update` flags.
#[instrument(skip(state), fields(tenant = %tenant))]
async fn recheck_divergence(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<RecheckSummary>, AppError> {
    let ctx = super::tenant_scope(&state, &tenant).await?;
    let tolerance = state.config().policy.price_tolerance;

    let summary = with_tenant(ctx, divergence::recheck_all(tolerance)).await?;

    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueRequest {
    product_id: i64,
    operation: QueueOperation,
    #[serde(default)]
    priority: i32,
}

/// POST /sync/{tenant}/queue - enqueue a product for asynchronous re-sync.
#[instrument(skip(state, request), fields(tenant = %tenant))]
async fn enqueue(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(request): Json<EnqueueRequest>,
) -> Result<Json<ExportQueueEntry>, AppError> {
    let ctx = super::tenant_scope(&state, &tenant).await?;

    let entry = with_tenant(ctx, async move {
        let ctx = crate::tenant::TenantContext::current()?;
        let queue = crate::db::ExportQueueRepository::new(ctx.pool());
        queue
            .enqueue(
                ProductId::new(request.product_id),
                request.operation,
                request.priority,
            )
            .await
            .map_err(crate::sync::SyncError::Repository)
    })
    .await?;

    Ok(Json(entry))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnsureWebhooksResponse {
    created: Vec<String>,
    existing: usize,
}

/// POST /sync/{tenant}/webhooks/ensure - idempotently register the order
/// webhook subscriptions on the channel.
#[instrument(skip(state), fields(tenant = %tenant))]
async fn ensure_webhooks(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Json<EnsureWebhooksResponse>, AppError> {
    let ctx = super::tenant_scope(&state, &tenant).await?;
    let url = format!("{}/webhooks/{tenant}/orders", state.config().base_url);

    let response = with_tenant(ctx, async move {
        let existing = state.channel().list_webhooks().await?;
        let mut created = Vec::new();

        for event in ORDER_WEBHOOK_EVENTS {
            let already = existing
                .iter()
                .any(|w| w.event == event && w.url == url);
            if already {
                continue;
            }
            let webhook = state
                .channel()
                .create_webhook(&WebhookPayload {
                    event: event.to_string(),
                    url: url.clone(),
                })
                .await?;
            created.push(webhook.event);
        }

        Ok::<_, AppError>(EnsureWebhooksResponse {
            existing: existing.len(),
            created,
        })
    })
    .await?;

    Ok(Json(response))
}
