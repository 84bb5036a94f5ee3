//! Inbound webhook endpoint.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::with_tenant;
use crate::webhooks::orders::OrderProcessor;
use crate::webhooks::{WebhookError, signature};

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/{tenant}/orders", post(order_webhook))
}

/// POST /webhooks/{tenant}/orders - one order delivery from the channel.
///
/// Responses follow the channel's retry contract: 200 `{ok:true}` on
/// success, 401 on signature failure, 400 on a malformed body, 503 when the
/// tenant is unknown or unconfigured, 500 otherwise.
#[instrument(skip(state, headers, body), fields(tenant = %tenant))]
async fn order_webhook(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = match super::tenant_scope(&state, &tenant).await {
        Ok(ctx) => ctx,
        Err(e) => return e.into_response(),
    };

    with_tenant(ctx, async move {
        match handle_delivery(&state, &headers, &body).await {
            Ok(()) => Json(json!({ "ok": true })).into_response(),
            Err(e) => e.into_response(),
        }
    })
    .await
}

async fn handle_delivery(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), AppError> {
    if state.config().webhook.allow_unsigned {
        warn!(
            "WEBHOOK SIGNATURE VERIFICATION BYPASSED - \
             accepting an unsigned delivery; never enable this in production"
        );
    } else {
        let secret = state.channel().webhook_secret().await?;
        signature::verify(secret.expose_secret().as_bytes(), body, headers)
            .map_err(WebhookError::Signature)?;
    }

    let payload: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| WebhookError::InvalidBody(e.to_string()))?;
    let remote_order_id = payload
        .get("id")
        .and_then(serde_json::Value::as_i64)
        .ok_or(WebhookError::MissingOrderId)?;

    let processor = OrderProcessor::new(
        state.channel(),
        &state.config().policy,
        &state.config().channel.platform,
    );
    let summary = processor.process_delivery(remote_order_id).await?;

    tracing::info!(
        remote_order_id,
        status = %summary.status,
        payment_status = %summary.payment_status,
        lines_applied = summary.lines_applied,
        lines_skipped = summary.lines_skipped,
        processed = summary.processed,
        "Order delivery processed"
    );

    Ok(())
}
