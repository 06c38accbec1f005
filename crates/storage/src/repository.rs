//! Repository ports.

use async_trait::async_trait;
use common::{BuyerId, OrderId, PageRequest, StoreId};
use domain::{Cart, Order, OrderNumber, OrderStatus, Purchase, Sale};

use crate::{Result, StorageError};

/// Order aggregate persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Commits an order together with all of its Purchase and Sale children
    /// as a single atomic unit: either every record is applied or none is.
    ///
    /// Ledger rows must pair 1:1 with the order's line items; a mismatched
    /// shape is rejected with [`StorageError::LedgerShapeMismatch`] before
    /// anything is written.
    async fn insert_order_with_ledger(
        &self,
        order: &Order,
        purchases: &[Purchase],
        sales: &[Sale],
    ) -> Result<()>;

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// True if an order already carries this number (collision-retry check).
    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool>;

    /// Looks up a buyer's order by its checkout idempotency key.
    async fn find_by_idempotency_key(&self, buyer_id: BuyerId, key: &str) -> Result<Option<Order>>;

    /// Persists a mutated order iff the stored row still holds `expected`,
    /// the status the caller read before mutating. A concurrent writer that
    /// moved the status first surfaces as [`StorageError::StatusConflict`];
    /// the caller re-reads and re-applies its transition. Orders are never
    /// deleted; there is deliberately no removal operation.
    async fn update_order(&self, order: &Order, expected: OrderStatus) -> Result<()>;

    /// All orders of a buyer, newest first.
    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>>;
}

/// Ledger record reads and status updates.
///
/// The settlement read layer only consumes the query methods; the update
/// methods exist for the cancel/refund write paths.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn purchases_for_order(&self, order_id: OrderId) -> Result<Vec<Purchase>>;

    async fn sales_for_order(&self, order_id: OrderId) -> Result<Vec<Sale>>;

    /// All purchases of a buyer, newest first.
    async fn purchases_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Purchase>>;

    /// One page of a buyer's purchases (newest first) plus the overall count.
    async fn purchases_for_buyer_page(
        &self,
        buyer_id: BuyerId,
        page: PageRequest,
    ) -> Result<(Vec<Purchase>, u64)>;

    /// All sales of a store, newest first.
    async fn sales_for_store(&self, store_id: StoreId) -> Result<Vec<Sale>>;

    /// One page of a store's sales (newest first) plus the overall count.
    async fn sales_for_store_page(
        &self,
        store_id: StoreId,
        page: PageRequest,
    ) -> Result<(Vec<Sale>, u64)>;

    async fn update_purchase(&self, purchase: &Purchase) -> Result<()>;

    async fn update_sale(&self, sale: &Sale) -> Result<()>;
}

/// Cart persistence with optimistic concurrency.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_cart(&self, buyer_id: BuyerId) -> Result<Option<Cart>>;

    /// Persists the cart iff the stored version still equals `cart.version`
    /// (version 0 meaning "not yet stored"), bumping the version by one.
    ///
    /// Returns the new version, or [`StorageError::CartConflict`] if a
    /// concurrent session won the race; the caller re-reads and retries.
    async fn save_cart(&self, cart: &Cart) -> Result<i64>;
}

/// Checks that the ledger rows of a checkout commit pair 1:1 with the
/// order's line items and reference the order. Shared by both backends.
pub(crate) fn validate_ledger_shape(
    order: &Order,
    purchases: &[Purchase],
    sales: &[Sale],
) -> Result<()> {
    let lines = order.line_items.len();
    if purchases.len() != lines || sales.len() != lines {
        return Err(StorageError::LedgerShapeMismatch(format!(
            "order {} has {lines} lines but {} purchases / {} sales",
            order.id,
            purchases.len(),
            sales.len(),
        )));
    }
    for record_order_id in purchases
        .iter()
        .map(|p| p.order_id)
        .chain(sales.iter().map(|s| s.order_id))
    {
        if record_order_id != order.id {
            return Err(StorageError::LedgerShapeMismatch(format!(
                "ledger row references order {record_order_id}, expected {}",
                order.id
            )));
        }
    }
    Ok(())
}
