//! Settlement error types.

use thiserror::Error;

/// Errors that can occur while building settlement views.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The ledger store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    /// A catalog lookup failed. Missing products are null-filled, not
    /// errors; this covers the store itself being unreachable.
    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),
}

/// Result type for settlement operations.
pub type Result<T> = std::result::Result<T, SettlementError>;
