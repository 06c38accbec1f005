//! The Ledger Writer: order fan-out as one logical unit.

use catalog::{CatalogError, CatalogStore};
use chrono::Utc;
use common::ProductId;
use domain::{
    CommissionRate, LineItem, Order, OrderNumber, Purchase, Sale,
};
use storage::{CartRepository, OrderRepository, StorageError};

use crate::request::OrderRequest;
use crate::services::{NotificationService, StoreOrderNotification};
use crate::{CheckoutError, Result};

/// Attempts at generating a non-colliding order number before giving up.
const ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// Attempts at the cart-clear compare-and-swap after a committed checkout.
const CART_CLEAR_ATTEMPTS: u32 = 3;

/// Takes a validated order request and atomically produces the Order, its
/// Purchase/Sale ledger children, stock decrements, sales-counter
/// increments, and per-store notifications.
///
/// Pipeline, in order:
/// 1. validate every line against the catalog — any failure aborts before
///    any mutation
/// 2. conditional stock decrement per line (a lost race here is
///    [`CheckoutError::StockUpdateFailed`] and undoes prior decrements)
/// 3. one atomic commit of Order + all Purchases + all Sales
/// 4. sales counters, cart clear, store notifications — best-effort after
///    the commit, logged on failure, never unwinding a committed order
pub struct LedgerWriter<S, C, N>
where
    S: OrderRepository + CartRepository,
    C: CatalogStore,
    N: NotificationService,
{
    store: S,
    catalog: C,
    notifications: N,
    commission_rate: CommissionRate,
}

impl<S, C, N> LedgerWriter<S, C, N>
where
    S: OrderRepository + CartRepository,
    C: CatalogStore,
    N: NotificationService,
{
    /// Creates a writer with the platform default commission rate.
    pub fn new(store: S, catalog: C, notifications: N) -> Self {
        Self::with_commission_rate(store, catalog, notifications, CommissionRate::default())
    }

    pub fn with_commission_rate(
        store: S,
        catalog: C,
        notifications: N,
        commission_rate: CommissionRate,
    ) -> Self {
        Self {
            store,
            catalog,
            notifications,
            commission_rate,
        }
    }

    /// Creates an order from a direct (non-cart) request.
    #[tracing::instrument(skip(self, request), fields(buyer_id = %request.buyer_id))]
    pub async fn create_order(&self, request: OrderRequest) -> Result<Order> {
        metrics::counter!("checkout_executions_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.run_pipeline(&request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        if result.is_err() {
            metrics::counter!("checkout_failed").increment(1);
        }
        result
    }

    /// Cart-driven checkout: builds the request from the buyer's cart,
    /// creates the order, then clears the cart.
    #[tracing::instrument(skip(self, request), fields(buyer_id = %request.buyer_id))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<Order> {
        let cart = self
            .store
            .find_cart(request.buyer_id)
            .await?
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CheckoutError::Validation("cart is empty".to_string()))?;

        let order_request = OrderRequest {
            buyer_id: request.buyer_id,
            lines: cart
                .lines
                .iter()
                .map(|line| crate::LineRequest {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            payment_status: request.payment_status,
            shipping_cost: request.shipping_cost,
            tax: request.tax,
            idempotency_key: request.idempotency_key,
        };

        let order = self.create_order(order_request).await?;
        self.clear_cart_after_checkout(request.buyer_id).await;
        Ok(order)
    }

    async fn run_pipeline(&self, request: &OrderRequest) -> Result<Order> {
        request.validate()?;

        // Retried submission: hand back the order the earlier attempt made.
        if let Some(key) = &request.idempotency_key
            && let Some(existing) = self
                .store
                .find_by_idempotency_key(request.buyer_id, key)
                .await?
        {
            tracing::info!(order_id = %existing.id, key, "idempotent checkout replay");
            return Ok(existing);
        }

        // Step 1: validate every line before touching anything. The store
        // on each line comes from the catalog, not the caller.
        let mut lines = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = self
                .catalog
                .get_product(line.product_id)
                .await?
                .ok_or(CheckoutError::ProductUnavailable(line.product_id))?;
            if !product.active {
                return Err(CheckoutError::ProductUnavailable(line.product_id));
            }
            if product.stock < i64::from(line.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            lines.push(LineItem::new(
                line.product_id,
                product.store_id,
                line.quantity,
                line.unit_price,
            ));
        }

        // Step 2: conditional decrements. Step 1 pre-validated, so a failure
        // here means a concurrent checkout won the race.
        let mut decremented: Vec<(ProductId, u32)> = Vec::with_capacity(lines.len());
        for line in &lines {
            match self.catalog.decrement_stock(line.product_id, line.quantity).await {
                Ok(()) => decremented.push((line.product_id, line.quantity)),
                Err(err) => {
                    let product_id = line.product_id;
                    tracing::warn!(%product_id, error = %err, "stock decrement lost a race");
                    self.restore_decrements(&decremented).await;
                    return Err(match err {
                        CatalogError::InsufficientStock { .. } => {
                            CheckoutError::StockUpdateFailed(product_id)
                        }
                        other => other.into(),
                    });
                }
            }
        }

        // Step 3: commit Order + Purchases + Sales atomically, regenerating
        // the order number if the random suffix collided.
        let order = match self.commit_order(request, lines).await {
            Ok(order) => order,
            Err(CheckoutError::Storage(StorageError::DuplicateIdempotencyKey(key))) => {
                // Two concurrent submissions with the same key; the other one
                // committed. Undo our decrements and replay its order.
                self.restore_decrements(&decremented).await;
                return self
                    .store
                    .find_by_idempotency_key(request.buyer_id, &key)
                    .await?
                    .ok_or(CheckoutError::Storage(
                        StorageError::DuplicateIdempotencyKey(key),
                    ));
            }
            Err(err) => {
                self.restore_decrements(&decremented).await;
                return Err(err);
            }
        };

        // Step 4: post-commit effects. The order is durable; failures here
        // are logged, never unwound.
        for (product_id, quantity) in &decremented {
            if let Err(err) = self.catalog.increment_sales(*product_id, *quantity).await {
                tracing::warn!(%product_id, error = %err, "sales counter increment failed");
            }
        }
        self.notify_stores(&order).await;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            lines = order.line_items.len(),
            total_cents = order.total.cents(),
            "order committed"
        );
        Ok(order)
    }

    async fn commit_order(&self, request: &OrderRequest, lines: Vec<LineItem>) -> Result<Order> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let now = Utc::now();
            let number = OrderNumber::generate(now);
            if self.store.order_number_exists(&number).await? {
                continue;
            }

            let order = Order::create(
                common::OrderId::new(),
                number,
                request.buyer_id,
                lines.clone(),
                request.shipping_address.clone(),
                request.payment_method,
                request.payment_status,
                request.shipping_cost,
                request.tax,
                request.idempotency_key.clone(),
                now,
            )?;

            let purchases: Vec<Purchase> = order
                .line_items
                .iter()
                .map(|line| {
                    Purchase::from_line(
                        order.id,
                        order.buyer_id,
                        line,
                        order.payment_method,
                        order.payment_status,
                        now,
                    )
                })
                .collect();
            let sales: Vec<Sale> = order
                .line_items
                .iter()
                .map(|line| {
                    Sale::from_line(
                        order.id,
                        order.buyer_id,
                        line,
                        self.commission_rate,
                        order.payment_method,
                        order.payment_status,
                        now,
                    )
                })
                .collect();

            match self
                .store
                .insert_order_with_ledger(&order, &purchases, &sales)
                .await
            {
                Ok(()) => return Ok(order),
                Err(StorageError::DuplicateOrderNumber(number)) => {
                    tracing::debug!(number, "order number collision, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::error!(
            buyer_id = %request.buyer_id,
            attempts = ORDER_NUMBER_ATTEMPTS,
            "order number generation kept colliding"
        );
        Err(CheckoutError::OrderNumberExhausted)
    }

    /// Undoes stock decrements in reverse order after a failed commit.
    /// A restore failure leaves a detectable discrepancy for reconciliation
    /// and is logged loudly rather than swallowed.
    async fn restore_decrements(&self, decremented: &[(ProductId, u32)]) {
        for (product_id, quantity) in decremented.iter().rev() {
            if let Err(err) = self.catalog.restore_stock(*product_id, *quantity).await {
                tracing::error!(
                    %product_id,
                    quantity,
                    error = %err,
                    "stock restore failed; counter needs reconciliation"
                );
            }
        }
    }

    async fn notify_stores(&self, order: &Order) {
        for (store_id, amount) in order.amounts_by_store() {
            let result = self
                .notifications
                .notify_store_of_order(StoreOrderNotification {
                    store_id,
                    order_id: order.id,
                    amount,
                })
                .await;
            if let Err(err) = result {
                tracing::warn!(%store_id, order_id = %order.id, error = %err, "store notification failed");
            }
        }
    }

    async fn clear_cart_after_checkout(&self, buyer_id: common::BuyerId) {
        for _ in 0..CART_CLEAR_ATTEMPTS {
            let Ok(Some(mut cart)) = self.store.find_cart(buyer_id).await else {
                return;
            };
            cart.clear(Utc::now());
            match self.store.save_cart(&cart).await {
                Ok(_) => return,
                Err(StorageError::CartConflict { .. }) => continue,
                Err(err) => {
                    tracing::warn!(%buyer_id, error = %err, "cart clear failed after checkout");
                    return;
                }
            }
        }
        tracing::warn!(%buyer_id, "cart clear kept losing the version race");
    }
}

/// Input of the cart-driven checkout variant.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub buyer_id: common::BuyerId,
    pub shipping_address: domain::Address,
    pub payment_method: domain::PaymentMethod,
    pub payment_status: domain::PaymentStatus,
    pub shipping_cost: common::Money,
    pub tax: common::Money,
    pub idempotency_key: Option<String>,
}
