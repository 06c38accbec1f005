//! The order aggregate and its value objects.

mod aggregate;
mod number;
mod status;
mod value_objects;

pub use aggregate::{Order, OrderError};
pub use number::OrderNumber;
pub use status::OrderStatus;
pub use value_objects::{Address, LineItem, PaymentMethod, PaymentStatus};
