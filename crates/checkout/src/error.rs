use catalog::CatalogError;
use common::{OrderId, ProductId};
use domain::{CartError, OrderError};
use storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the checkout pipeline.
///
/// Validation and availability errors are detected before any mutation;
/// `StockUpdateFailed` marks a stock race lost at commit time after the
/// pre-validation passed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed or missing input, rejected before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The product does not exist or is inactive.
    #[error("Product unavailable: {0}")]
    ProductUnavailable(ProductId),

    /// Requested quantity exceeds available stock.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// The conditional stock decrement lost a race at commit time.
    #[error("Stock update failed for {0}")]
    StockUpdateFailed(ProductId),

    /// Order-number generation kept colliding; transient, the request can
    /// be retried as-is.
    #[error("Could not allocate a unique order number")]
    OrderNumberExhausted,

    /// Order lookup miss.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Order aggregate error, including illegal status transitions.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Cart error, including missing cart lines.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Catalog boundary failure not covered by the variants above.
    #[error("Catalog error: {0}")]
    Catalog(CatalogError),

    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CatalogError> for CheckoutError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ProductNotFound(id) | CatalogError::ProductUnavailable(id) => {
                CheckoutError::ProductUnavailable(id)
            }
            CatalogError::InsufficientStock {
                product_id,
                requested,
                available,
            } => CheckoutError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => CheckoutError::Catalog(other),
        }
    }
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
