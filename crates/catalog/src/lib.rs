//! Catalog store boundary.
//!
//! The marketplace core does not own the product catalog; it reads product
//! records and conditionally mutates two counters: `stock` (decremented at
//! checkout, restored on cancellation) and `sales_count`. The decrement is
//! the contended operation across concurrent checkouts, so both backends
//! implement it as a single check-and-decrement: the in-memory store under
//! a write lock, PostgreSQL via `UPDATE ... WHERE stock >= $qty`.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod product;
pub mod store;

pub use error::{CatalogError, Result};
pub use memory::InMemoryCatalog;
pub use postgres::PostgresCatalog;
pub use product::Product;
pub use store::CatalogStore;
