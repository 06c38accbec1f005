use async_trait::async_trait;
use common::{Money, ProductId, StoreId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{CatalogError, CatalogStore, Product, Result};

/// PostgreSQL-backed catalog store.
///
/// The stock decrement relies on a conditional `UPDATE ... WHERE stock >= $qty`
/// so the availability check and the decrement happen in one statement.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
            sales_count: row.try_get("sales_count")?,
            active: row.try_get("active")?,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalog {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, store_id, name, category, price_cents, stock, sales_count, active
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let qty = i64::from(quantity);
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2
            WHERE id = $1 AND stock >= $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(qty)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Zero rows: either the product is missing or the guard lost the race.
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            Some(available) => Err(CatalogError::InsufficientStock {
                product_id,
                requested: quantity,
                available,
            }),
            None => Err(CatalogError::ProductNotFound(product_id)),
        }
    }

    async fn increment_sales(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE products SET sales_count = sales_count + $2 WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(i64::from(quantity))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::ProductNotFound(product_id));
        }
        Ok(())
    }

    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(i64::from(quantity))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::ProductNotFound(product_id));
        }
        Ok(())
    }
}
