//! Per-buyer shopping cart.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{BuyerId, Money, ProductId, StoreId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cart mutation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("No cart line for product {0}")]
    LineNotFound(ProductId),

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },
}

/// One line of a cart: a product with a price snapshot taken when the line
/// was last touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub quantity: u32,
    pub unit_price: Money,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Cart lines of one store with their sub-total, produced by
/// [`Cart::group_by_store`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreGroup {
    pub store_id: StoreId,
    pub lines: Vec<CartLine>,
    pub subtotal: Money,
}

/// The per-buyer cart document.
///
/// `total_amount` is recomputed on every mutation. The `version` field is
/// the optimistic-concurrency token: concurrent sessions of the same buyer
/// are serialized by a compare-and-swap on it in the cart repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub buyer_id: BuyerId,
    pub lines: Vec<CartLine>,
    pub total_amount: Money,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a buyer.
    pub fn empty(buyer_id: BuyerId, now: DateTime<Utc>) -> Self {
        Self {
            buyer_id,
            lines: Vec::new(),
            total_amount: Money::zero(),
            version: 0,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Adds a product, summing quantities if the line already exists and
    /// refreshing the price snapshot to the catalog's current price.
    pub fn upsert_line(
        &mut self,
        product_id: ProductId,
        store_id: StoreId,
        quantity: u32,
        unit_price: Money,
        now: DateTime<Utc>,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity += quantity;
                line.unit_price = unit_price;
            }
            None => self.lines.push(CartLine {
                product_id,
                store_id,
                quantity,
                unit_price,
                added_at: now,
            }),
        }

        self.touch(now);
        Ok(())
    }

    /// Replaces the quantity of an existing line.
    ///
    /// Fails with [`CartError::LineNotFound`] if the product is not in the
    /// cart. Quantity zero is rejected here; callers remove the line instead.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        line.quantity = quantity;

        self.touch(now);
        Ok(())
    }

    /// Removes a line. Idempotent: removing an absent product is a no-op.
    pub fn remove_line(&mut self, product_id: ProductId, now: DateTime<Utc>) {
        self.lines.retain(|l| l.product_id != product_id);
        self.touch(now);
    }

    /// Empties the cart. Idempotent and never fails.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.lines.clear();
        self.touch(now);
    }

    /// Partitions the lines by owning store with one sub-total per store.
    ///
    /// Used for checkout review and per-store notification; checkout itself
    /// still produces a single order across stores.
    pub fn group_by_store(&self) -> Vec<StoreGroup> {
        let mut groups: BTreeMap<StoreId, StoreGroup> = BTreeMap::new();
        for line in &self.lines {
            let group = groups.entry(line.store_id).or_insert_with(|| StoreGroup {
                store_id: line.store_id,
                lines: Vec::new(),
                subtotal: Money::zero(),
            });
            group.subtotal += line.total();
            group.lines.push(line.clone());
        }
        groups.into_values().collect()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.total_amount = self.lines.iter().map(CartLine::total).sum();
        self.updated_at = now;
    }
}
