use async_trait::async_trait;
use common::{BuyerId, Money, OrderId, PageRequest, ProductId, StoreId};
use domain::{
    Cart, CartLine, CommissionRate, LedgerStatus, Order, OrderNumber, OrderStatus, PaymentMethod,
    PaymentStatus, Purchase, Sale,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::repository::{CartRepository, LedgerRepository, OrderRepository, validate_ledger_shape};
use crate::{Result, StorageError};

/// PostgreSQL-backed store.
///
/// The checkout commit runs in one transaction, so an order and its ledger
/// children are either all visible or none are.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn parse_payment_method(value: String) -> Result<PaymentMethod> {
        PaymentMethod::parse(&value).ok_or(StorageError::CorruptColumn {
            column: "payment_method",
            value,
        })
    }

    fn parse_payment_status(value: String) -> Result<PaymentStatus> {
        PaymentStatus::parse(&value).ok_or(StorageError::CorruptColumn {
            column: "payment_status",
            value,
        })
    }

    fn parse_ledger_status(value: String) -> Result<LedgerStatus> {
        LedgerStatus::parse(&value).ok_or(StorageError::CorruptColumn {
            column: "status",
            value,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status_text: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_text).ok_or(StorageError::CorruptColumn {
            column: "status",
            value: status_text,
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::from_string(row.try_get::<String, _>("order_number")?),
            buyer_id: BuyerId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            ordered_at: row.try_get("ordered_at")?,
            line_items: serde_json::from_value(row.try_get("line_items")?)?,
            shipping_address: serde_json::from_value(row.try_get("shipping_address")?)?,
            payment_method: Self::parse_payment_method(row.try_get("payment_method")?)?,
            payment_status: Self::parse_payment_status(row.try_get("payment_status")?)?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            shipping_cost: Money::from_cents(row.try_get("shipping_cents")?),
            tax: Money::from_cents(row.try_get("tax_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            status,
            tracking_number: row.try_get("tracking_number")?,
            carrier: row.try_get("carrier")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            cancel_reason: row.try_get("cancel_reason")?,
            cancelled_by: row.try_get("cancelled_by")?,
            idempotency_key: row.try_get("idempotency_key")?,
        })
    }

    fn row_to_purchase(row: PgRow) -> Result<Purchase> {
        Ok(Purchase {
            id: row.try_get("id")?,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            buyer_id: BuyerId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
            quantity: row.try_get::<i64, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            payment_method: Self::parse_payment_method(row.try_get("payment_method")?)?,
            payment_status: Self::parse_payment_status(row.try_get("payment_status")?)?,
            status: Self::parse_ledger_status(row.try_get("status")?)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            notes: row.try_get("notes")?,
        })
    }

    fn row_to_sale(row: PgRow) -> Result<Sale> {
        let rate: f64 = row.try_get("commission_rate")?;
        let commission_rate =
            CommissionRate::new(rate).map_err(|_| StorageError::CorruptColumn {
                column: "commission_rate",
                value: rate.to_string(),
            })?;

        Ok(Sale {
            id: row.try_get("id")?,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            buyer_id: BuyerId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
            quantity: row.try_get::<i64, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            commission_rate,
            commission: Money::from_cents(row.try_get("commission_cents")?),
            net: Money::from_cents(row.try_get("net_cents")?),
            payment_method: Self::parse_payment_method(row.try_get("payment_method")?)?,
            payment_status: Self::parse_payment_status(row.try_get("payment_status")?)?,
            status: Self::parse_ledger_status(row.try_get("status")?)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            notes: row.try_get("notes")?,
        })
    }

    fn row_to_cart(row: PgRow) -> Result<Cart> {
        let lines: Vec<CartLine> = serde_json::from_value(row.try_get("lines")?)?;
        let total_amount = lines.iter().map(CartLine::total).sum();
        Ok(Cart {
            buyer_id: BuyerId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
            lines,
            total_amount,
            version: row.try_get("version")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn insert_purchase(
        tx: &mut Transaction<'_, Postgres>,
        purchase: &Purchase,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO purchases (id, order_id, buyer_id, product_id, store_id, quantity,
                                   unit_price_cents, total_cents, payment_method, payment_status,
                                   status, created_at, updated_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(purchase.id)
        .bind(purchase.order_id.as_uuid())
        .bind(purchase.buyer_id.as_uuid())
        .bind(purchase.product_id.as_uuid())
        .bind(purchase.store_id.as_uuid())
        .bind(i64::from(purchase.quantity))
        .bind(purchase.unit_price.cents())
        .bind(purchase.total.cents())
        .bind(purchase.payment_method.as_str())
        .bind(purchase.payment_status.as_str())
        .bind(purchase.status.as_str())
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .bind(&purchase.notes)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_sale(tx: &mut Transaction<'_, Postgres>, sale: &Sale) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sales (id, order_id, buyer_id, product_id, store_id, quantity,
                               unit_price_cents, total_cents, commission_rate, commission_cents,
                               net_cents, payment_method, payment_status, status,
                               created_at, updated_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(sale.id)
        .bind(sale.order_id.as_uuid())
        .bind(sale.buyer_id.as_uuid())
        .bind(sale.product_id.as_uuid())
        .bind(sale.store_id.as_uuid())
        .bind(i64::from(sale.quantity))
        .bind(sale.unit_price.cents())
        .bind(sale.total.cents())
        .bind(sale.commission_rate.value())
        .bind(sale.commission.cents())
        .bind(sale.net.cents())
        .bind(sale.payment_method.as_str())
        .bind(sale.payment_status.as_str())
        .bind(sale.status.as_str())
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(&sale.notes)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert_order_with_ledger(
        &self,
        order: &Order,
        purchases: &[Purchase],
        sales: &[Sale],
    ) -> Result<()> {
        validate_ledger_shape(order, purchases, sales)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, buyer_id, ordered_at, line_items,
                                shipping_address, payment_method, payment_status,
                                subtotal_cents, shipping_cents, tax_cents, total_cents,
                                status, tracking_number, carrier, shipped_at, delivered_at,
                                cancelled_at, cancel_reason, cancelled_by, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.buyer_id.as_uuid())
        .bind(order.ordered_at)
        .bind(serde_json::to_value(&order.line_items)?)
        .bind(serde_json::to_value(&order.shipping_address)?)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.subtotal.cents())
        .bind(order.shipping_cost.cents())
        .bind(order.tax.cents())
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(&order.tracking_number)
        .bind(&order.carrier)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(&order.cancel_reason)
        .bind(&order.cancelled_by)
        .bind(&order.idempotency_key)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("unique_order_number") => {
                        return StorageError::DuplicateOrderNumber(
                            order.order_number.to_string(),
                        );
                    }
                    Some("unique_order_idempotency_key") => {
                        return StorageError::DuplicateIdempotencyKey(
                            order.idempotency_key.clone().unwrap_or_default(),
                        );
                    }
                    _ => {}
                }
            }
            StorageError::Database(e)
        })?;

        for purchase in purchases {
            Self::insert_purchase(&mut tx, purchase).await?;
        }
        for sale in sales {
            Self::insert_sale(&mut tx, sale).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE order_number = $1)")
                .bind(number.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_by_idempotency_key(&self, buyer_id: BuyerId, key: &str) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE buyer_id = $1 AND idempotency_key = $2")
            .bind(buyer_id.as_uuid())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn update_order(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = $2, status = $3, tracking_number = $4, carrier = $5,
                shipped_at = $6, delivered_at = $7, cancelled_at = $8,
                cancel_reason = $9, cancelled_by = $10
            WHERE id = $1 AND status = $11
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(&order.tracking_number)
        .bind(&order.carrier)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(&order.cancel_reason)
        .bind(&order.cancelled_by)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Zero rows: either the order is missing or a concurrent
            // transition moved the status first.
            let actual: Option<String> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(order.id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;
            return Err(match actual {
                Some(actual) => StorageError::StatusConflict {
                    order_id: order.id,
                    expected: expected.as_str(),
                    actual,
                },
                None => StorageError::OrderNotFound(order.id),
            });
        }
        Ok(())
    }

    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY ordered_at DESC")
            .bind(buyer_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl LedgerRepository for PostgresStore {
    async fn purchases_for_order(&self, order_id: OrderId) -> Result<Vec<Purchase>> {
        let rows = sqlx::query("SELECT * FROM purchases WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_purchase).collect()
    }

    async fn sales_for_order(&self, order_id: OrderId) -> Result<Vec<Sale>> {
        let rows = sqlx::query("SELECT * FROM sales WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_sale).collect()
    }

    async fn purchases_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Purchase>> {
        let rows =
            sqlx::query("SELECT * FROM purchases WHERE buyer_id = $1 ORDER BY created_at DESC")
                .bind(buyer_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Self::row_to_purchase).collect()
    }

    async fn purchases_for_buyer_page(
        &self,
        buyer_id: BuyerId,
        page: PageRequest,
    ) -> Result<(Vec<Purchase>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE buyer_id = $1")
            .bind(buyer_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM purchases
            WHERE buyer_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(buyer_id.as_uuid())
        .bind(page.offset() as i64)
        .bind(page.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_purchase)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total as u64))
    }

    async fn sales_for_store(&self, store_id: StoreId) -> Result<Vec<Sale>> {
        let rows = sqlx::query("SELECT * FROM sales WHERE store_id = $1 ORDER BY created_at DESC")
            .bind(store_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_sale).collect()
    }

    async fn sales_for_store_page(
        &self,
        store_id: StoreId,
        page: PageRequest,
    ) -> Result<(Vec<Sale>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE store_id = $1")
            .bind(store_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM sales
            WHERE store_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(store_id.as_uuid())
        .bind(page.offset() as i64)
        .bind(page.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_sale)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total as u64))
    }

    async fn update_purchase(&self, purchase: &Purchase) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE purchases
            SET payment_status = $2, status = $3, updated_at = $4, notes = $5
            WHERE id = $1
            "#,
        )
        .bind(purchase.id)
        .bind(purchase.payment_status.as_str())
        .bind(purchase.status.as_str())
        .bind(purchase.updated_at)
        .bind(&purchase.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_sale(&self, sale: &Sale) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sales
            SET payment_status = $2, status = $3, updated_at = $4, notes = $5
            WHERE id = $1
            "#,
        )
        .bind(sale.id)
        .bind(sale.payment_status.as_str())
        .bind(sale.status.as_str())
        .bind(sale.updated_at)
        .bind(&sale.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PostgresStore {
    async fn find_cart(&self, buyer_id: BuyerId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT buyer_id, lines, version, updated_at FROM carts WHERE buyer_id = $1")
            .bind(buyer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_cart).transpose()
    }

    async fn save_cart(&self, cart: &Cart) -> Result<i64> {
        let lines = serde_json::to_value(&cart.lines)?;

        if cart.version == 0 {
            let inserted = sqlx::query(
                r#"
                INSERT INTO carts (buyer_id, lines, version, updated_at)
                VALUES ($1, $2, 1, $3)
                ON CONFLICT (buyer_id) DO NOTHING
                "#,
            )
            .bind(cart.buyer_id.as_uuid())
            .bind(&lines)
            .bind(cart.updated_at)
            .execute(&self.pool)
            .await?;

            if inserted.rows_affected() == 1 {
                return Ok(1);
            }
            // A concurrent session created the cart first.
            let actual: i64 = sqlx::query_scalar("SELECT version FROM carts WHERE buyer_id = $1")
                .bind(cart.buyer_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
            return Err(StorageError::CartConflict {
                buyer_id: cart.buyer_id,
                expected: 0,
                actual,
            });
        }

        let updated = sqlx::query(
            r#"
            UPDATE carts
            SET lines = $2, version = version + 1, updated_at = $3
            WHERE buyer_id = $1 AND version = $4
            "#,
        )
        .bind(cart.buyer_id.as_uuid())
        .bind(&lines)
        .bind(cart.updated_at)
        .bind(cart.version)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            let actual: i64 =
                sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM carts WHERE buyer_id = $1")
                    .bind(cart.buyer_id.as_uuid())
                    .fetch_one(&self.pool)
                    .await?;
            return Err(StorageError::CartConflict {
                buyer_id: cart.buyer_id,
                expected: cart.version,
                actual,
            });
        }
        Ok(cart.version + 1)
    }
}
