//! Persistence for the marketplace core.
//!
//! Three repository ports cover the durable records:
//! - [`OrderRepository`] — order aggregates, including the atomic
//!   order-plus-ledger insert that commits an order and all of its
//!   Purchase/Sale children as one unit
//! - [`LedgerRepository`] — buyer/seller ledger reads and status updates
//! - [`CartRepository`] — per-buyer carts with optimistic concurrency
//!
//! Two backends: [`MemoryStore`] (tokio `RwLock`, for tests and local runs)
//! and [`PostgresStore`] (sqlx, one transaction per checkout commit).

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{Result, StorageError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repository::{CartRepository, LedgerRepository, OrderRepository};
