//! HTTP surface of the sync server.
//!
//! - `POST /webhooks/{tenant}/orders` - inbound order deliveries
//! - `POST /sync/{tenant}/products` - admin-invoked reconciliation trigger
//! - `POST /sync/{tenant}/divergence/recheck` - divergence recheck
//! - `POST /sync/{tenant}/queue` - enqueue export work
//! - `POST /sync/{tenant}/webhooks/ensure` - channel-side webhook registration

mod sync;
mod webhooks;

use axum::Router;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::TenantContext;

/// Assemble all routes.
pub fn routes() -> Router<AppState> {
    Router::new().merge(webhooks::router()).merge(sync::router())
}

/// Resolve a path tenant tag into a context.
async fn tenant_scope(state: &AppState, tag: &str) -> Result<TenantContext, AppError> {
    Ok(state.registry().context(tag).await?)
}
