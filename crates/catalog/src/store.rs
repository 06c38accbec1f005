//! The catalog store port.

use async_trait::async_trait;
use common::ProductId;

use crate::{Product, Result};

/// Read and counter-mutation operations against the product catalog.
///
/// `decrement_stock` is the only contended operation: implementations must
/// check `stock >= quantity` and decrement in the same atomic step so that
/// concurrent checkouts of the last unit cannot both succeed.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up a product by ID.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Atomically decrements stock by `quantity`.
    ///
    /// Fails with [`crate::CatalogError::InsufficientStock`] if the decrement
    /// would take stock below zero, leaving the counter unchanged.
    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<()>;

    /// Increments the sales counter by `quantity`.
    async fn increment_sales(&self, product_id: ProductId, quantity: u32) -> Result<()>;

    /// Adds `quantity` back to stock, compensating a previous decrement
    /// (order cancellation or a failed checkout commit).
    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<()>;
}
