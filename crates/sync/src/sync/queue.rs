//! Export queue batch processor.
//!
//! A background task drains pending entries for every tenant on an
//! interval. The claim is a single atomic statement (see
//! [`crate::db::ExportQueueRepository::claim_batch`]); processing wraps the
//! reconciler with per-entry failure isolation and attempt bookkeeping.

use tracing::{error, info, instrument, warn};

use super::SyncError;
use super::reconciler::Reconciler;
use crate::state::AppState;
use crate::tenant::{TenantContext, with_tenant};

/// Counters from one drain pass over one tenant's queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainStats {
    pub claimed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Run the export queue worker until the process shuts down.
///
/// Should be spawned once at startup; each tick visits every configured
/// tenant in turn.
pub async fn run_worker(state: AppState) {
    let mut ticker = tokio::time::interval(state.config().policy.queue_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        for tag in state.registry().tags() {
            let ctx = match state.registry().context(tag.as_str()).await {
                Ok(ctx) => ctx,
                Err(e) => {
                    error!(tenant = %tag, error = %e, "Queue worker could not scope tenant");
                    continue;
                }
            };

            let scoped_state = state.clone();
            let result = with_tenant(ctx, async move { drain_once(&scoped_state).await }).await;

            match result {
                Ok(stats) if stats.claimed > 0 => {
                    info!(
                        tenant = %tag,
                        claimed = stats.claimed,
                        succeeded = stats.succeeded,
                        failed = stats.failed,
                        "Export queue batch processed"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(tenant = %tag, error = %e, "Export queue drain failed"),
            }
        }
    }
}

/// Claim and process one batch for the current tenant.
///
/// # Errors
///
/// Returns `SyncError` when the claim itself fails; per-entry reconciliation
/// failures are recorded on the entry and counted, never propagated.
#[instrument(skip(state))]
pub async fn drain_once(state: &AppState) -> Result<DrainStats, SyncError> {
    let ctx = TenantContext::current()?;
    let policy = &state.config().policy;
    let queue = crate::db::ExportQueueRepository::new(ctx.pool());

    let batch = queue
        .claim_batch(policy.queue_batch_size, policy.queue_max_attempts)
        .await?;

    let mut stats = DrainStats {
        claimed: batch.len(),
        ..DrainStats::default()
    };

    let reconciler = Reconciler::new(state.channel());
    for entry in batch {
        match reconciler.sync_product(entry.product_id, None).await {
            Ok(outcome) if outcome.ok => {
                queue.mark_success(entry.id).await?;
                stats.succeeded += 1;
            }
            Ok(outcome) => {
                let reason = outcome
                    .error
                    .unwrap_or_else(|| "sync reported failure".to_string());
                queue
                    .mark_error(entry.id, &reason, policy.queue_max_attempts)
                    .await?;
                stats.failed += 1;
            }
            Err(e) => {
                warn!(entry_id = %entry.id, product_id = %entry.product_id, error = %e,
                      "Queue entry failed");
                queue
                    .mark_error(entry.id, &e.to_string(), policy.queue_max_attempts)
                    .await?;
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}
