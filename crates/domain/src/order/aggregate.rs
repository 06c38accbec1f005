//! Order aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{BuyerId, Money, OrderId, StoreId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Address, LineItem, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus};

/// Errors raised by the order aggregate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order has no line items")]
    EmptyOrder,

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("Negative unit price: {cents} cents")]
    NegativeUnitPrice { cents: i64 },

    #[error("Negative {kind}: {cents} cents")]
    NegativeCharge { kind: &'static str, cents: i64 },

    #[error("Incomplete shipping address")]
    IncompleteAddress,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatus { from: OrderStatus, to: OrderStatus },
}

/// Buyer-facing aggregate representing one checkout transaction, possibly
/// spanning multiple stores.
///
/// Totals are recomputed from the line items in [`Order::create`] and never
/// trusted from caller input: `subtotal == Σ line.total` and
/// `total == subtotal + shipping_cost + tax` hold on every persisted order.
/// Orders are never deleted; cancellation is a status transition that keeps
/// the record as an audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub buyer_id: BuyerId,
    pub ordered_at: DateTime<Utc>,
    pub line_items: Vec<LineItem>,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub tax: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<String>,
    /// Client-supplied key deduplicating retried checkout submissions.
    pub idempotency_key: Option<String>,
}

impl Order {
    /// Creates a pending order, validating every line and recomputing all
    /// totals from the line items.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: OrderId,
        order_number: OrderNumber,
        buyer_id: BuyerId,
        line_items: Vec<LineItem>,
        shipping_address: Address,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
        shipping_cost: Money,
        tax: Money,
        idempotency_key: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if line_items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if !shipping_address.is_complete() {
            return Err(OrderError::IncompleteAddress);
        }
        if shipping_cost.is_negative() {
            return Err(OrderError::NegativeCharge {
                kind: "shipping cost",
                cents: shipping_cost.cents(),
            });
        }
        if tax.is_negative() {
            return Err(OrderError::NegativeCharge {
                kind: "tax",
                cents: tax.cents(),
            });
        }

        // Rebuild each line so the stored totals are derived, not trusted.
        let mut rebuilt = Vec::with_capacity(line_items.len());
        for line in line_items {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: line.quantity,
                });
            }
            if line.unit_price.is_negative() {
                return Err(OrderError::NegativeUnitPrice {
                    cents: line.unit_price.cents(),
                });
            }
            rebuilt.push(LineItem::new(
                line.product_id,
                line.store_id,
                line.quantity,
                line.unit_price,
            ));
        }

        let subtotal: Money = rebuilt.iter().map(|l| l.total).sum();
        let total = subtotal + shipping_cost + tax;

        Ok(Self {
            id,
            order_number,
            buyer_id,
            ordered_at: now,
            line_items: rebuilt,
            shipping_address,
            payment_method,
            payment_status,
            subtotal,
            shipping_cost,
            tax,
            total,
            status: OrderStatus::Pending,
            tracking_number: None,
            carrier: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            cancel_reason: None,
            cancelled_by: None,
            idempotency_key,
        })
    }

    /// Moves the order to `target`, stamping the transition side effects.
    ///
    /// Returns `Ok(false)` for a same-status no-op. Entering `Shipped` or
    /// `Delivered` stamps the corresponding date; entering `Cancelled`
    /// additionally records the reason and acting party. Terminal states
    /// reject every other target with [`OrderError::InvalidStatus`].
    pub fn transition(
        &mut self,
        target: OrderStatus,
        actor: Option<String>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<bool, OrderError> {
        if self.status == target {
            return Ok(false);
        }
        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidStatus {
                from: self.status,
                to: target,
            });
        }

        match target {
            OrderStatus::Shipped => self.shipped_at = Some(now),
            OrderStatus::Delivered => self.delivered_at = Some(now),
            OrderStatus::Cancelled => {
                self.cancelled_at = Some(now);
                self.cancel_reason = reason;
                self.cancelled_by = actor;
            }
            _ => {}
        }

        self.status = target;
        Ok(true)
    }

    /// Records carrier tracking details, typically alongside the `Shipped`
    /// transition.
    pub fn set_tracking(&mut self, carrier: impl Into<String>, tracking: impl Into<String>) {
        self.carrier = Some(carrier.into());
        self.tracking_number = Some(tracking.into());
    }

    /// Sums line totals per store, for checkout review and the per-store
    /// order-received notifications. One checkout still produces a single
    /// order spanning stores.
    pub fn amounts_by_store(&self) -> BTreeMap<StoreId, Money> {
        let mut amounts = BTreeMap::new();
        for line in &self.line_items {
            *amounts.entry(line.store_id).or_insert(Money::zero()) += line.total;
        }
        amounts
    }
}
