//! The order fan-out pipeline.
//!
//! [`LedgerWriter`] is the write path of the marketplace: it turns a
//! validated order request into an Order, its Purchase/Sale ledger children,
//! stock decrements, and per-store notifications, as a single logical
//! unit with explicit stock compensation when the commit fails midway.
//!
//! [`CartService`] feeds it: per-buyer cart mutations with availability
//! checks, serialized by optimistic concurrency. [`OrderService`] handles
//! the post-checkout lifecycle, wiring cancellation to stock restoration
//! and ledger status sync.

pub mod cart_service;
pub mod error;
pub mod orders;
pub mod request;
pub mod services;
pub mod writer;

pub use cart_service::CartService;
pub use error::{CheckoutError, Result};
pub use orders::OrderService;
pub use request::{LineRequest, OrderRequest};
pub use services::{InMemoryNotifier, LogNotifier, NotificationService, StoreOrderNotification};
pub use writer::{CheckoutRequest, LedgerWriter};
