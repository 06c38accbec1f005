//! Outbound service ports.

pub mod notification;

pub use notification::{InMemoryNotifier, LogNotifier, NotificationService, StoreOrderNotification};
