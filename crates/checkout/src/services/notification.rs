//! Notification port and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, OrderId, StoreId};
use tokio::sync::RwLock;

/// Payload of an order-received notification: one per distinct store in
/// the order, carrying that store's share of the order amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOrderNotification {
    pub store_id: StoreId,
    pub order_id: OrderId,
    pub amount: Money,
}

/// Delivery transport is outside the core; implementations hand the payload
/// to whatever carries it. Failures are logged by the caller, never allowed
/// to fail a committed checkout.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Tells a store that an order containing its products was placed.
    async fn notify_store_of_order(
        &self,
        notification: StoreOrderNotification,
    ) -> std::result::Result<(), String>;
}

/// In-memory notifier for tests and local runs; records every payload.
#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    sent: Arc<RwLock<Vec<StoreOrderNotification>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all notifications sent so far.
    pub async fn sent(&self) -> Vec<StoreOrderNotification> {
        self.sent.read().await.clone()
    }

    /// Returns the notifications sent for one order.
    pub async fn sent_for_order(&self, order_id: OrderId) -> Vec<StoreOrderNotification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.order_id == order_id)
            .cloned()
            .collect()
    }
}

/// Notifier that emits the payload as a structured log line. Stands in for
/// a real transport in the server binary; delivery is out of scope.
#[derive(Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationService for LogNotifier {
    async fn notify_store_of_order(
        &self,
        notification: StoreOrderNotification,
    ) -> std::result::Result<(), String> {
        tracing::info!(
            store_id = %notification.store_id,
            order_id = %notification.order_id,
            amount_cents = notification.amount.cents(),
            "order received notification"
        );
        Ok(())
    }
}

#[async_trait]
impl NotificationService for InMemoryNotifier {
    async fn notify_store_of_order(
        &self,
        notification: StoreOrderNotification,
    ) -> std::result::Result<(), String> {
        self.sent.write().await.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_notifications_per_order() {
        let notifier = InMemoryNotifier::new();
        let order_a = OrderId::new();
        let order_b = OrderId::new();

        for (order_id, cents) in [(order_a, 100), (order_a, 250), (order_b, 75)] {
            notifier
                .notify_store_of_order(StoreOrderNotification {
                    store_id: StoreId::new(),
                    order_id,
                    amount: Money::from_cents(cents),
                })
                .await
                .unwrap();
        }

        assert_eq!(notifier.sent().await.len(), 3);
        assert_eq!(notifier.sent_for_order(order_a).await.len(), 2);
    }
}
