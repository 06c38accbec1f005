use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BuyerId, OrderId, PageRequest, StoreId};
use domain::{Cart, Order, OrderNumber, OrderStatus, Purchase, Sale};
use tokio::sync::RwLock;

use crate::repository::{CartRepository, LedgerRepository, OrderRepository, validate_ledger_shape};
use crate::{Result, StorageError};

#[derive(Default)]
struct MemoryState {
    orders: HashMap<OrderId, Order>,
    purchases: Vec<Purchase>,
    sales: Vec<Sale>,
    carts: HashMap<BuyerId, Cart>,
    fail_next_commit: bool,
    all_order_numbers_taken: bool,
}

/// In-memory store for tests and local runs.
///
/// All records live behind one lock, so the order-plus-ledger insert is a
/// single write-lock critical section — the same all-or-nothing behavior
/// the PostgreSQL backend gets from a transaction.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next checkout commit fail, for exercising the stock
    /// compensation path in tests.
    pub async fn set_fail_next_commit(&self, fail: bool) {
        self.state.write().await.fail_next_commit = fail;
    }

    /// Makes every order number read as taken, for exercising the
    /// generation-retry exhaustion path in tests.
    pub async fn set_all_order_numbers_taken(&self, taken: bool) {
        self.state.write().await.all_order_numbers_taken = taken;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of stored purchase rows.
    pub async fn purchase_count(&self) -> usize {
        self.state.read().await.purchases.len()
    }

    /// Returns the number of stored sale rows.
    pub async fn sale_count(&self) -> usize {
        self.state.read().await.sales.len()
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order_with_ledger(
        &self,
        order: &Order,
        purchases: &[Purchase],
        sales: &[Sale],
    ) -> Result<()> {
        validate_ledger_shape(order, purchases, sales)?;

        let mut state = self.state.write().await;

        if state.fail_next_commit {
            state.fail_next_commit = false;
            return Err(StorageError::Database(sqlx::Error::PoolClosed));
        }

        if state
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StorageError::DuplicateOrderNumber(
                order.order_number.to_string(),
            ));
        }
        if let Some(key) = &order.idempotency_key
            && state
                .orders
                .values()
                .any(|o| o.buyer_id == order.buyer_id && o.idempotency_key.as_ref() == Some(key))
        {
            return Err(StorageError::DuplicateIdempotencyKey(key.clone()));
        }

        state.orders.insert(order.id, order.clone());
        state.purchases.extend_from_slice(purchases);
        state.sales.extend_from_slice(sales);
        Ok(())
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.all_order_numbers_taken
            || state.orders.values().any(|o| &o.order_number == number))
    }

    async fn find_by_idempotency_key(&self, buyer_id: BuyerId, key: &str) -> Result<Option<Order>> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .values()
            .find(|o| o.buyer_id == buyer_id && o.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn update_order(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&order.id) {
            Some(stored) if stored.status == expected => {
                *stored = order.clone();
                Ok(())
            }
            Some(stored) => Err(StorageError::StatusConflict {
                order_id: order.id,
                expected: expected.as_str(),
                actual: stored.status.as_str().to_string(),
            }),
            None => Err(StorageError::OrderNotFound(order.id)),
        }
    }

    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at));
        Ok(orders)
    }
}

#[async_trait]
impl LedgerRepository for MemoryStore {
    async fn purchases_for_order(&self, order_id: OrderId) -> Result<Vec<Purchase>> {
        Ok(self
            .state
            .read()
            .await
            .purchases
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn sales_for_order(&self, order_id: OrderId) -> Result<Vec<Sale>> {
        Ok(self
            .state
            .read()
            .await
            .sales
            .iter()
            .filter(|s| s.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn purchases_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Purchase>> {
        let state = self.state.read().await;
        let mut purchases: Vec<Purchase> = state
            .purchases
            .iter()
            .filter(|p| p.buyer_id == buyer_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(purchases)
    }

    async fn purchases_for_buyer_page(
        &self,
        buyer_id: BuyerId,
        page: PageRequest,
    ) -> Result<(Vec<Purchase>, u64)> {
        let all = self.purchases_for_buyer(buyer_id).await?;
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn sales_for_store(&self, store_id: StoreId) -> Result<Vec<Sale>> {
        let state = self.state.read().await;
        let mut sales: Vec<Sale> = state
            .sales
            .iter()
            .filter(|s| s.store_id == store_id)
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sales)
    }

    async fn sales_for_store_page(
        &self,
        store_id: StoreId,
        page: PageRequest,
    ) -> Result<(Vec<Sale>, u64)> {
        let all = self.sales_for_store(store_id).await?;
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn update_purchase(&self, purchase: &Purchase) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(stored) = state.purchases.iter_mut().find(|p| p.id == purchase.id) {
            *stored = purchase.clone();
        }
        Ok(())
    }

    async fn update_sale(&self, sale: &Sale) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(stored) = state.sales.iter_mut().find(|s| s.id == sale.id) {
            *stored = sale.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_cart(&self, buyer_id: BuyerId) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(&buyer_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<i64> {
        let mut state = self.state.write().await;
        let stored_version = state.carts.get(&cart.buyer_id).map(|c| c.version).unwrap_or(0);

        if stored_version != cart.version {
            return Err(StorageError::CartConflict {
                buyer_id: cart.buyer_id,
                expected: cart.version,
                actual: stored_version,
            });
        }

        let mut next = cart.clone();
        next.version += 1;
        let version = next.version;
        state.carts.insert(cart.buyer_id, next);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{Money, ProductId};
    use domain::{
        Address, CommissionRate, LineItem, OrderStatus, PaymentMethod, PaymentStatus,
    };

    use super::*;

    fn address() -> Address {
        Address {
            recipient: "A. Buyer".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    fn order_with_ledger(buyer_id: BuyerId, key: Option<String>) -> (Order, Vec<Purchase>, Vec<Sale>) {
        let lines = vec![
            LineItem::new(ProductId::new(), StoreId::new(), 2, Money::from_cents(1000)),
            LineItem::new(ProductId::new(), StoreId::new(), 1, Money::from_cents(500)),
        ];
        let order = Order::create(
            OrderId::new(),
            OrderNumber::generate(Utc::now()),
            buyer_id,
            lines,
            address(),
            PaymentMethod::Card,
            PaymentStatus::Paid,
            Money::zero(),
            Money::zero(),
            key,
            Utc::now(),
        )
        .unwrap();

        let now = Utc::now();
        let purchases: Vec<Purchase> = order
            .line_items
            .iter()
            .map(|l| {
                Purchase::from_line(
                    order.id,
                    order.buyer_id,
                    l,
                    order.payment_method,
                    order.payment_status,
                    now,
                )
            })
            .collect();
        let sales: Vec<Sale> = order
            .line_items
            .iter()
            .map(|l| {
                Sale::from_line(
                    order.id,
                    order.buyer_id,
                    l,
                    CommissionRate::default(),
                    order.payment_method,
                    order.payment_status,
                    now,
                )
            })
            .collect();
        (order, purchases, sales)
    }

    #[tokio::test]
    async fn commit_stores_order_and_children() {
        let store = MemoryStore::new();
        let buyer = BuyerId::new();
        let (order, purchases, sales) = order_with_ledger(buyer, None);

        store
            .insert_order_with_ledger(&order, &purchases, &sales)
            .await
            .unwrap();

        assert!(store.find_order(order.id).await.unwrap().is_some());
        assert_eq!(store.purchases_for_order(order.id).await.unwrap().len(), 2);
        assert_eq!(store.sales_for_order(order.id).await.unwrap().len(), 2);
        assert!(store.order_number_exists(&order.order_number).await.unwrap());
    }

    #[tokio::test]
    async fn mismatched_ledger_shape_is_rejected() {
        let store = MemoryStore::new();
        let (order, purchases, _) = order_with_ledger(BuyerId::new(), None);

        let err = store
            .insert_order_with_ledger(&order, &purchases, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::LedgerShapeMismatch(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.purchase_count().await, 0);
    }

    #[tokio::test]
    async fn failed_commit_leaves_nothing_behind() {
        let store = MemoryStore::new();
        let (order, purchases, sales) = order_with_ledger(BuyerId::new(), None);

        store.set_fail_next_commit(true).await;
        assert!(store
            .insert_order_with_ledger(&order, &purchases, &sales)
            .await
            .is_err());

        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.purchase_count().await, 0);
        assert_eq!(store.sale_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_rejected() {
        let store = MemoryStore::new();
        let buyer = BuyerId::new();
        let (first, p1, s1) = order_with_ledger(buyer, Some("key-1".to_string()));
        let (second, p2, s2) = order_with_ledger(buyer, Some("key-1".to_string()));

        store.insert_order_with_ledger(&first, &p1, &s1).await.unwrap();
        let err = store
            .insert_order_with_ledger(&second, &p2, &s2)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateIdempotencyKey(_)));

        let found = store
            .find_by_idempotency_key(buyer, "key-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn update_order_persists_status() {
        let store = MemoryStore::new();
        let (mut order, purchases, sales) = order_with_ledger(BuyerId::new(), None);
        store
            .insert_order_with_ledger(&order, &purchases, &sales)
            .await
            .unwrap();

        order
            .transition(OrderStatus::Shipped, None, None, Utc::now())
            .unwrap();
        store.update_order(&order, OrderStatus::Pending).await.unwrap();

        let stored = store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);
        assert!(stored.shipped_at.is_some());
    }

    #[tokio::test]
    async fn stale_status_update_is_a_conflict() {
        let store = MemoryStore::new();
        let (order, purchases, sales) = order_with_ledger(BuyerId::new(), None);
        store
            .insert_order_with_ledger(&order, &purchases, &sales)
            .await
            .unwrap();

        // Two writers both read `pending`; only the first transition lands.
        let mut first = order.clone();
        first
            .transition(OrderStatus::Cancelled, None, None, Utc::now())
            .unwrap();
        store.update_order(&first, OrderStatus::Pending).await.unwrap();

        let mut second = order.clone();
        second
            .transition(OrderStatus::Cancelled, None, None, Utc::now())
            .unwrap();
        let err = store
            .update_order(&second, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::StatusConflict {
                expected: "pending",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn cart_cas_rejects_stale_writer() {
        let store = MemoryStore::new();
        let buyer = BuyerId::new();
        let now = Utc::now();

        let mut cart = Cart::empty(buyer, now);
        cart.upsert_line(ProductId::new(), StoreId::new(), 1, Money::from_cents(100), now)
            .unwrap();

        // Two sessions loaded version 0; only the first write wins.
        let stale = cart.clone();
        store.save_cart(&cart).await.unwrap();
        let err = store.save_cart(&stale).await.unwrap_err();
        assert!(matches!(err, StorageError::CartConflict { .. }));
    }

    #[tokio::test]
    async fn buyer_page_slices_newest_first() {
        let store = MemoryStore::new();
        let buyer = BuyerId::new();
        for _ in 0..5 {
            let (order, purchases, sales) = order_with_ledger(buyer, None);
            store
                .insert_order_with_ledger(&order, &purchases, &sales)
                .await
                .unwrap();
        }

        let (items, total) = store
            .purchases_for_buyer_page(buyer, PageRequest::new(2, 4))
            .await
            .unwrap();
        assert_eq!(total, 10);
        assert_eq!(items.len(), 4);
    }
}
