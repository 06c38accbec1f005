//! Buyer/seller ledger records.
//!
//! Every order line fans out into exactly one [`Purchase`] (buyer side) and
//! one [`Sale`] (seller side). The pair shares quantity, unit price, and
//! total by construction; the sale additionally carries the platform
//! commission split.

mod purchase;
mod sale;

pub use purchase::Purchase;
pub use sale::{CommissionRate, RateError, Sale};

use serde::{Deserialize, Serialize};

/// Status of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    #[default]
    Completed,
    Cancelled,
    Refunded,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Completed => "completed",
            LedgerStatus::Cancelled => "cancelled",
            LedgerStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(LedgerStatus::Completed),
            "cancelled" => Some(LedgerStatus::Cancelled),
            "refunded" => Some(LedgerStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
