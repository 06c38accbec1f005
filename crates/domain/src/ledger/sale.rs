use chrono::{DateTime, Utc};
use common::{BuyerId, Money, OrderId, ProductId, StoreId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::order::{LineItem, PaymentMethod, PaymentStatus};

use super::LedgerStatus;

/// A commission rate outside `[0, 1]`.
#[derive(Debug, Error, PartialEq)]
#[error("Commission rate must be within [0, 1], got {0}")]
pub struct RateError(pub f64);

/// Platform commission rate, a fraction of the line total in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionRate(f64);

impl CommissionRate {
    /// Validates and wraps a rate.
    pub fn new(rate: f64) -> Result<Self, RateError> {
        if !(0.0..=1.0).contains(&rate) || rate.is_nan() {
            return Err(RateError(rate));
        }
        Ok(Self(rate))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for CommissionRate {
    /// The platform default cut: 5%.
    fn default() -> Self {
        Self(0.05)
    }
}

impl std::fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seller-side ledger row, one per order line item.
///
/// Mirrors its paired [`crate::Purchase`] and additionally carries the
/// commission split: `commission == round(total * rate)` and
/// `net == total - commission`, computed once at creation. Commission is
/// immutable history; editing the platform rate affects future sales only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub order_id: OrderId,
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
    pub commission_rate: CommissionRate,
    pub commission: Money,
    /// Amount owed to the seller after the platform cut.
    pub net: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Sale {
    /// Creates the seller-side record for one order line, computing the
    /// commission split from `rate`.
    pub fn from_line(
        order_id: OrderId,
        buyer_id: BuyerId,
        line: &LineItem,
        rate: CommissionRate,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let commission = line.total.fraction(rate.value());
        Self {
            id: Uuid::new_v4(),
            order_id,
            buyer_id,
            product_id: line.product_id,
            store_id: line.store_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total: line.total,
            commission_rate: rate,
            commission,
            net: line.total - commission,
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
