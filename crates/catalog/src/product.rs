use common::{Money, ProductId, StoreId};
use serde::{Deserialize, Serialize};

/// A catalog product as seen by the marketplace core.
///
/// The core never creates or deletes catalog entries; it reads price,
/// stock, and the activity flag, and mutates the two counters through
/// [`crate::CatalogStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub category: String,
    /// Current catalog price; orders snapshot the price at order time.
    pub price: Money,
    pub stock: i64,
    pub sales_count: i64,
    pub active: bool,
}

impl Product {
    /// Returns true if the product is active and has at least `quantity` in stock.
    pub fn can_fulfill(&self, quantity: u32) -> bool {
        self.active && self.stock >= i64::from(quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, active: bool) -> Product {
        Product {
            id: ProductId::new(),
            store_id: StoreId::new(),
            name: "Widget".to_string(),
            category: "tools".to_string(),
            price: Money::from_cents(1000),
            stock,
            sales_count: 0,
            active,
        }
    }

    #[test]
    fn can_fulfill_requires_active_and_stock() {
        assert!(product(5, true).can_fulfill(5));
        assert!(!product(5, true).can_fulfill(6));
        assert!(!product(5, false).can_fulfill(1));
        assert!(!product(0, true).can_fulfill(1));
    }
}
