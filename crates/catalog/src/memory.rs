use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::RwLock;

use crate::{CatalogError, CatalogStore, Product, Result};

/// In-memory catalog for tests and local runs.
///
/// Stock decrements take the write lock for the whole check-and-decrement,
/// giving the same no-oversell guarantee as the conditional SQL update.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product. Seeding helper for tests and demos.
    pub async fn put_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    /// Returns the current stock level, if the product exists.
    pub async fn stock_of(&self, product_id: ProductId) -> Option<i64> {
        self.products.read().await.get(&product_id).map(|p| p.stock)
    }

    /// Returns the current sales counter, if the product exists.
    pub async fn sales_count_of(&self, product_id: ProductId) -> Option<i64> {
        self.products
            .read()
            .await
            .get(&product_id)
            .map(|p| p.sales_count)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&product_id).cloned())
    }

    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        let requested = i64::from(quantity);
        if product.stock < requested {
            return Err(CatalogError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= requested;
        Ok(())
    }

    async fn increment_sales(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or(CatalogError::ProductNotFound(product_id))?;
        product.sales_count += i64::from(quantity);
        Ok(())
    }

    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or(CatalogError::ProductNotFound(product_id))?;
        product.stock += i64::from(quantity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, StoreId};

    use super::*;

    fn widget(stock: i64) -> Product {
        Product {
            id: ProductId::new(),
            store_id: StoreId::new(),
            name: "Widget".to_string(),
            category: "tools".to_string(),
            price: Money::from_cents(1000),
            stock,
            sales_count: 0,
            active: true,
        }
    }

    #[tokio::test]
    async fn decrement_reduces_stock() {
        let catalog = InMemoryCatalog::new();
        let product = widget(5);
        let id = product.id;
        catalog.put_product(product).await;

        catalog.decrement_stock(id, 3).await.unwrap();
        assert_eq!(catalog.stock_of(id).await, Some(2));
    }

    #[tokio::test]
    async fn decrement_below_zero_is_rejected() {
        let catalog = InMemoryCatalog::new();
        let product = widget(2);
        let id = product.id;
        catalog.put_product(product).await;

        let err = catalog.decrement_stock(id, 3).await.unwrap_err();
        assert!(matches!(err, CatalogError::InsufficientStock { available: 2, .. }));
        // Counter untouched after the failed decrement.
        assert_eq!(catalog.stock_of(id).await, Some(2));
    }

    #[tokio::test]
    async fn concurrent_decrements_of_last_unit() {
        let catalog = InMemoryCatalog::new();
        let product = widget(1);
        let id = product.id;
        catalog.put_product(product).await;

        let (a, b) = tokio::join!(catalog.decrement_stock(id, 1), catalog.decrement_stock(id, 1));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(catalog.stock_of(id).await, Some(0));
    }

    #[tokio::test]
    async fn restore_adds_stock_back() {
        let catalog = InMemoryCatalog::new();
        let product = widget(5);
        let id = product.id;
        catalog.put_product(product).await;

        catalog.decrement_stock(id, 4).await.unwrap();
        catalog.restore_stock(id, 4).await.unwrap();
        assert_eq!(catalog.stock_of(id).await, Some(5));
    }

    #[tokio::test]
    async fn sales_counter_increments() {
        let catalog = InMemoryCatalog::new();
        let product = widget(5);
        let id = product.id;
        catalog.put_product(product).await;

        catalog.increment_sales(id, 2).await.unwrap();
        catalog.increment_sales(id, 1).await.unwrap();
        assert_eq!(catalog.sales_count_of(id).await, Some(3));
    }

    #[tokio::test]
    async fn missing_product_is_an_error() {
        let catalog = InMemoryCatalog::new();
        let err = catalog.decrement_stock(ProductId::new(), 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(_)));
    }
}
