//! Marketplace domain model.
//!
//! This crate holds the pure domain types of the order fan-out pipeline:
//! - the [`Order`] aggregate with embedded line items and recomputed totals
//! - the order status state machine ([`OrderStatus`])
//! - buyer/seller ledger records ([`Purchase`], [`Sale`]) with commission math
//! - the per-buyer [`Cart`] document
//!
//! Persistence and orchestration live in the `storage` and `checkout` crates;
//! nothing here performs I/O.

pub mod cart;
pub mod ledger;
pub mod order;

pub use cart::{Cart, CartError, CartLine, StoreGroup};
pub use ledger::{CommissionRate, LedgerStatus, Purchase, RateError, Sale};
pub use order::{
    Address, LineItem, Order, OrderError, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus,
};
