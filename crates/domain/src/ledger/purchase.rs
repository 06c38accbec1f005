use chrono::{DateTime, Utc};
use common::{BuyerId, Money, OrderId, ProductId, StoreId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::{LineItem, PaymentMethod, PaymentStatus};

use super::LedgerStatus;

/// Buyer-side ledger row, one per order line item.
///
/// Created at order time with status `completed`; mutated afterwards only by
/// cancel/refund operations, never by the settlement read layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub order_id: OrderId,
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Purchase {
    /// Creates the buyer-side record for one order line.
    pub fn from_line(
        order_id: OrderId,
        buyer_id: BuyerId,
        line: &LineItem,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            buyer_id,
            product_id: line.product_id,
            store_id: line.store_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total: line.total,
            payment_method,
            payment_status,
            status: LedgerStatus::Completed,
            created_at: now,
            updated_at: now,
            notes: None,
        }
    }

    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        self.status = LedgerStatus::Cancelled;
        self.updated_at = now;
    }

    pub fn mark_refunded(&mut self, notes: Option<String>, now: DateTime<Utc>) {
        self.status = LedgerStatus::Refunded;
        self.notes = notes;
        self.updated_at = now;
    }
}
