use common::{BuyerId, OrderId};
use thiserror::Error;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No order exists with the given ID.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order status write found the row no longer holding the status the
    /// caller read; a concurrent transition won the race.
    #[error("Order {order_id} status conflict: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: &'static str,
        actual: String,
    },

    /// A cart write lost the optimistic-concurrency race.
    #[error("Cart conflict for buyer {buyer_id}: expected version {expected}, found {actual}")]
    CartConflict {
        buyer_id: BuyerId,
        expected: i64,
        actual: i64,
    },

    /// The generated order number is already taken; the caller regenerates.
    #[error("Order number already exists: {0}")]
    DuplicateOrderNumber(String),

    /// An order with this idempotency key was already committed.
    #[error("Duplicate idempotency key: {0}")]
    DuplicateIdempotencyKey(String),

    /// A checkout commit whose ledger rows do not pair 1:1 with the order
    /// lines. This is a caller bug the store refuses to persist.
    #[error("Ledger shape mismatch: {0}")]
    LedgerShapeMismatch(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored text column holds a value the domain cannot parse.
    #[error("Corrupt stored value in column {column}: {value}")]
    CorruptColumn { column: &'static str, value: String },
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
