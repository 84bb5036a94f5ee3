//! Inbound order processor.
//!
//! State machine per remote order, keyed by (platform, remote order id):
//! unseen -> recorded -> processed (stock debited) -> reverted (stock
//! credited back). The `processed_at` stamp on the header is the sole
//! idempotency gate; stock mutation itself is a clamped single-statement
//! update in the product repository.

use rust_decimal::Decimal;
use tracing::{instrument, warn};

use vitrine_core::{OrderStatus, PaymentStatus};

use super::WebhookError;
use crate::channel::ChannelClient;
use crate::channel::types::RemoteOrder;
use crate::config::SyncPolicy;
use crate::db::orders::UpsertOrder;
use crate::db::{OrderRepository, ProductRepository};
use crate::models::{ChannelOrderLine, NewOrderLine};
use crate::tenant::TenantContext;

/// What a delivery means for local stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecision {
    /// Paid/authorized and not yet processed: subtract each line's quantity.
    Debit,
    /// Cancelled after processing: add each line's quantity back.
    Credit,
    /// Already in the right state (or still pending): no stock movement.
    Noop,
}

/// Decide the stock action for a normalized order state.
#[must_use]
pub fn plan_stock_action(
    status: &OrderStatus,
    payment: &PaymentStatus,
    processed: bool,
) -> StockDecision {
    if status.is_cancelled() || *payment == PaymentStatus::Cancelled {
        if processed {
            return StockDecision::Credit;
        }
        return StockDecision::Noop;
    }

    if payment.is_chargeable() && !processed {
        return StockDecision::Debit;
    }

    StockDecision::Noop
}

/// Summary of one processed delivery.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub remote_order_id: i64,
    pub status: String,
    pub payment_status: String,
    /// Lines whose stock delta applied.
    pub lines_applied: usize,
    /// Lines that failed or could not be resolved to a local product.
    pub lines_skipped: usize,
    /// Final processed state of the order.
    pub processed: bool,
}

/// Processes authenticated order deliveries for the current tenant.
pub struct OrderProcessor<'a> {
    channel: &'a ChannelClient,
    policy: &'a SyncPolicy,
    platform: &'a str,
}

impl<'a> OrderProcessor<'a> {
    /// Create an order processor.
    #[must_use]
    pub const fn new(channel: &'a ChannelClient, policy: &'a SyncPolicy, platform: &'a str) -> Self {
        Self {
            channel,
            policy,
            platform,
        }
    }

    /// Process one authenticated delivery.
    ///
    /// The webhook payload is only trusted for the order ID; everything else
    /// comes from a fresh fetch of the full order.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` when the order cannot be fetched or the local
    /// database fails. Per-line stock failures are counted, never fatal.
    #[instrument(skip(self), fields(platform = %self.platform))]
    pub async fn process_delivery(&self, remote_order_id: i64) -> Result<ProcessSummary, WebhookError> {
        let ctx = TenantContext::current()?;
        let orders = OrderRepository::new(ctx.pool());
        let products = ProductRepository::new(ctx.pool());

        let remote = self
            .channel
            .get_order(remote_order_id)
            .await?
            .ok_or(WebhookError::OrderNotFound(remote_order_id))?;

        let status = OrderStatus::parse(remote.status.as_deref().unwrap_or("open"));
        let payment =
            PaymentStatus::normalized_for(remote.payment_status.as_deref().unwrap_or(""), &status);

        let header = orders
            .upsert_header(&UpsertOrder {
                platform: self.platform,
                remote_order_id,
                status: status.as_str(),
                payment_status: payment.as_str(),
                customer_name: remote
                    .customer
                    .as_ref()
                    .and_then(|c| c.name.as_deref()),
                customer_email: remote
                    .customer
                    .as_ref()
                    .and_then(|c| c.email.as_deref()),
                total: remote.total,
            })
            .await?;

        // Line replacement must complete before stock evaluation reads the
        // lines back; `replace_lines` returns the freshly inserted rows.
        let new_lines = self.resolve_lines(&products, &remote).await?;
        let lines = orders.replace_lines(header.id, &new_lines).await?;

        let decision = plan_stock_action(&status, &payment, header.is_processed());
        let (applied, skipped, processed) = match decision {
            StockDecision::Debit => {
                let (applied, skipped) =
                    self.apply_deltas(&products, &lines, Sign::Debit).await;
                if applied > 0 {
                    orders.set_processed(header.id, true).await?;
                    (applied, skipped, true)
                } else {
                    warn!(remote_order_id, "No line could be debited; order left unprocessed");
                    (applied, skipped, false)
                }
            }
            StockDecision::Credit => {
                let (applied, skipped) =
                    self.apply_deltas(&products, &lines, Sign::Credit).await;
                if applied > 0 {
                    orders.set_processed(header.id, false).await?;
                    (applied, skipped, false)
                } else {
                    warn!(remote_order_id, "No line could be credited; processed flag untouched");
                    (applied, skipped, header.is_processed())
                }
            }
            StockDecision::Noop => (0, 0, header.is_processed()),
        };

        Ok(ProcessSummary {
            remote_order_id,
            status: status.as_str().to_string(),
            payment_status: payment.as_str().to_string(),
            lines_applied: applied,
            lines_skipped: skipped,
            processed,
        })
    }

    /// Normalize remote line items, resolving local products via barcode
    /// only.
    async fn resolve_lines(
        &self,
        products: &ProductRepository<'_>,
        remote: &RemoteOrder,
    ) -> Result<Vec<NewOrderLine>, WebhookError> {
        let mut lines = Vec::with_capacity(remote.line_items.len());
        for item in &remote.line_items {
            let product_id = match item.barcode.as_deref() {
                Some(barcode) => products.find_by_barcode(barcode).await?,
                None => None,
            };

            if product_id.is_none() {
                warn!(
                    sku = item.sku.as_deref().unwrap_or(""),
                    barcode = item.barcode.as_deref().unwrap_or(""),
                    "Order line did not resolve to a local product"
                );
            }

            lines.push(NewOrderLine {
                product_id,
                sku: item.sku.clone(),
                barcode: item.barcode.clone(),
                remote_variant_id: item.variant_id.clone(),
                description: item.name.clone(),
                quantity: item.quantity.unwrap_or(Decimal::ZERO),
                unit_price: item.price,
            });
        }
        Ok(lines)
    }

    /// Apply clamped per-line deltas, isolating failures per line.
    ///
    /// Returns (applied, skipped-or-failed).
    async fn apply_deltas(
        &self,
        products: &ProductRepository<'_>,
        lines: &[ChannelOrderLine],
        sign: Sign,
    ) -> (usize, usize) {
        let mut applied = 0;
        let mut skipped = 0;

        for line in lines {
            let Some(product_id) = line.product_id else {
                skipped += 1;
                continue;
            };

            let magnitude = line.quantity.abs();
            if magnitude.is_zero() {
                skipped += 1;
                continue;
            }
            let delta = match sign {
                Sign::Debit => -magnitude,
                Sign::Credit => magnitude,
            };

            match products
                .apply_stock_delta(product_id, delta, self.policy.stock_floor)
                .await
            {
                Ok(Some(_)) => applied += 1,
                Ok(None) => {
                    warn!(product_id = %product_id, "Stock update hit a missing product row");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(product_id = %product_id, error = %e, "Stock update failed");
                    skipped += 1;
                }
            }
        }

        (applied, skipped)
    }
}

#[derive(Debug, Clone, Copy)]
enum Sign {
    Debit,
    Credit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid() -> PaymentStatus {
        PaymentStatus::Paid
    }

    fn open() -> OrderStatus {
        OrderStatus::Open
    }

    fn cancelled() -> OrderStatus {
        OrderStatus::Cancelled
    }

    #[test]
    fn test_paid_unprocessed_debits() {
        assert_eq!(
            plan_stock_action(&open(), &paid(), false),
            StockDecision::Debit
        );
    }

    #[test]
    fn test_paid_redelivery_is_noop() {
        // The same "paid" webhook delivered twice debits exactly once.
        assert_eq!(
            plan_stock_action(&open(), &paid(), true),
            StockDecision::Noop
        );
    }

    #[test]
    fn test_authorized_also_debits() {
        assert_eq!(
            plan_stock_action(&open(), &PaymentStatus::Authorized, false),
            StockDecision::Debit
        );
    }

    #[test]
    fn test_cancellation_after_processing_credits() {
        assert_eq!(
            plan_stock_action(&cancelled(), &PaymentStatus::Cancelled, true),
            StockDecision::Credit
        );
    }

    #[test]
    fn test_cancellation_redelivery_is_noop() {
        // A second "cancelled" delivery arrives with processed already false.
        assert_eq!(
            plan_stock_action(&cancelled(), &PaymentStatus::Cancelled, false),
            StockDecision::Noop
        );
    }

    #[test]
    fn test_cancellation_before_processing_is_noop() {
        assert_eq!(
            plan_stock_action(&cancelled(), &PaymentStatus::Cancelled, false),
            StockDecision::Noop
        );
    }

    #[test]
    fn test_pending_payment_is_noop() {
        assert_eq!(
            plan_stock_action(&open(), &PaymentStatus::Pending, false),
            StockDecision::Noop
        );
    }

    #[test]
    fn test_forced_cancelled_payment_wins_over_open_status() {
        // Payment status was forced to cancelled during normalization even
        // though the channel still reported the order as open.
        assert_eq!(
            plan_stock_action(&open(), &PaymentStatus::Cancelled, true),
            StockDecision::Credit
        );
    }
}
