use common::ProductId;
use thiserror::Error;

/// Errors from the catalog boundary.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product exists with the given ID.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product exists but is inactive.
    #[error("Product unavailable: {0}")]
    ProductUnavailable(ProductId),

    /// The conditional decrement would take stock below zero.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
