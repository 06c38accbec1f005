//! Shared types for the marketplace core.
//!
//! Typed identifiers keep buyer, store, product, and order references from
//! being mixed up; [`Money`] holds all financial amounts in integer cents.

pub mod pagination;
pub mod types;

pub use pagination::{PageRequest, Paginated};
pub use types::{BuyerId, Money, OrderId, ProductId, StoreId};
