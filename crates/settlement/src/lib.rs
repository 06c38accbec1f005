//! Read-side aggregation over the Purchase/Sale ledger.
//!
//! Everything here is derived, never authoritative: the views read the
//! ledger rows the checkout pipeline wrote and fold them into buyer- and
//! seller-facing statistics. Joined product lookups null-fill when the
//! catalog entry is gone; a deleted product never breaks a report.

pub mod buyer;
pub mod error;
pub mod rollup;
pub mod seller;

pub use buyer::{BuyerSettlementView, BuyerSpendSummary, PurchaseHistoryEntry};
pub use error::{Result, SettlementError};
pub use rollup::{CategoryBreakdown, MonthlyBucket, ProductBreakdown, RollupView};
pub use seller::{SaleEntry, SellerSalesStats, SellerSettlementView};
