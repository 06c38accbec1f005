//! Post-checkout order lifecycle.

use catalog::CatalogStore;
use chrono::Utc;
use common::{BuyerId, OrderId};
use domain::{Order, OrderStatus, PaymentStatus};
use storage::{LedgerRepository, OrderRepository};

use crate::{CheckoutError, Result};

/// Status transitions and refunds for committed orders.
///
/// Cancellation is the inverse of checkout: the order moves to
/// `cancelled`, every line's stock is restored, and the Purchase/Sale
/// ledger children are marked cancelled so settlement views stop
/// counting them.
pub struct OrderService<S, C>
where
    S: OrderRepository + LedgerRepository,
    C: CatalogStore,
{
    store: S,
    catalog: C,
}

impl<S, C> OrderService<S, C>
where
    S: OrderRepository + LedgerRepository,
    C: CatalogStore,
{
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))
    }

    /// A buyer's orders, newest first.
    pub async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_buyer(buyer_id).await?)
    }

    /// Moves an order to `target`. Re-applying the current status is a
    /// no-op; an illegal transition (anything out of a terminal status)
    /// is rejected without touching the order.
    #[tracing::instrument(skip(self, actor, reason))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        actor: Option<String>,
        reason: Option<String>,
    ) -> Result<Order> {
        let mut order = self.get_order(order_id).await?;
        let read_status = order.status;

        let changed = order.transition(target, actor, reason, Utc::now())?;
        if !changed {
            return Ok(order);
        }

        // The status predicate keeps a concurrent transition from landing
        // twice; the loser gets a conflict instead of double-unwinding.
        self.store.update_order(&order, read_status).await?;
        metrics::counter!("order_status_transitions_total").increment(1);

        if target == OrderStatus::Cancelled {
            self.unwind_cancellation(&order).await;
        }

        tracing::info!(%order_id, status = %order.status, "order status updated");
        Ok(order)
    }

    /// Refunds a paid order: payment status flips to refunded on the order
    /// and on every ledger child. Only paid orders can be refunded; the
    /// order status itself is left untouched (a refund does not imply a
    /// cancellation).
    #[tracing::instrument(skip(self, notes))]
    pub async fn refund_order(
        &self,
        order_id: OrderId,
        notes: Option<String>,
    ) -> Result<Order> {
        let mut order = self.get_order(order_id).await?;

        if order.payment_status != PaymentStatus::Paid {
            return Err(CheckoutError::Validation(format!(
                "only paid orders can be refunded, payment status is {}",
                order.payment_status.as_str()
            )));
        }

        let now = Utc::now();
        order.payment_status = PaymentStatus::Refunded;
        self.store.update_order(&order, order.status).await?;

        for mut purchase in self.store.purchases_for_order(order_id).await? {
            purchase.payment_status = PaymentStatus::Refunded;
            purchase.mark_refunded(notes.clone(), now);
            self.store.update_purchase(&purchase).await?;
        }
        for mut sale in self.store.sales_for_order(order_id).await? {
            sale.payment_status = PaymentStatus::Refunded;
            sale.mark_refunded(notes.clone(), now);
            self.store.update_sale(&sale).await?;
        }

        metrics::counter!("order_refunds_total").increment(1);
        tracing::info!(%order_id, "order refunded");
        Ok(order)
    }

    /// Restores stock and marks ledger children cancelled. The order is
    /// already durably cancelled at this point, so failures are logged
    /// for reconciliation rather than surfaced.
    async fn unwind_cancellation(&self, order: &Order) {
        let now = Utc::now();

        for line in order.line_items.iter().rev() {
            if let Err(err) = self
                .catalog
                .restore_stock(line.product_id, line.quantity)
                .await
            {
                tracing::error!(
                    order_id = %order.id,
                    product_id = %line.product_id,
                    error = %err,
                    "stock restore on cancellation failed"
                );
            }
        }

        match self.store.purchases_for_order(order.id).await {
            Ok(purchases) => {
                for mut purchase in purchases {
                    purchase.mark_cancelled(now);
                    if let Err(err) = self.store.update_purchase(&purchase).await {
                        tracing::error!(order_id = %order.id, error = %err, "purchase cancel failed");
                    }
                }
            }
            Err(err) => {
                tracing::error!(order_id = %order.id, error = %err, "purchase lookup failed on cancel")
            }
        }
        match self.store.sales_for_order(order.id).await {
            Ok(sales) => {
                for mut sale in sales {
                    sale.mark_cancelled(now);
                    if let Err(err) = self.store.update_sale(&sale).await {
                        tracing::error!(order_id = %order.id, error = %err, "sale cancel failed");
                    }
                }
            }
            Err(err) => {
                tracing::error!(order_id = %order.id, error = %err, "sale lookup failed on cancel")
            }
        }

        metrics::counter!("order_cancellations_total").increment(1);
    }
}
