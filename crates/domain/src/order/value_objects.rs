//! Value objects embedded in the order aggregate.

use common::{Money, ProductId, StoreId};
use serde::{Deserialize, Serialize};

/// One line of an order.
///
/// The unit price is the price at order time, decoupled from the catalog's
/// current price. Line items are immutable after order creation; the line
/// total is derived in the constructor and never trusted from callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

impl LineItem {
    /// Creates a line item, deriving the total from quantity and unit price.
    pub fn new(product_id: ProductId, store_id: StoreId, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id,
            store_id,
            quantity,
            unit_price,
            total: unit_price.times(quantity),
        }
    }
}

/// Shipping address snapshot taken at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Returns true if every field is non-blank.
    pub fn is_complete(&self) -> bool {
        ![
            &self.recipient,
            &self.street,
            &self.city,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .any(|f| f.trim().is_empty())
    }
}

/// How the buyer pays. Payment itself is handled outside the core; the
/// method and status are accepted as inputs and recorded on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(PaymentMethod::Card),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status as reported by the external payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_item_total_is_derived() {
        let line = LineItem::new(ProductId::new(), StoreId::new(), 3, Money::from_cents(250));
        assert_eq!(line.total.cents(), 750);
    }

    #[test]
    fn address_completeness() {
        let addr = Address {
            recipient: "A. Buyer".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        };
        assert!(addr.is_complete());

        let blank_city = Address {
            city: "  ".to_string(),
            ..addr
        };
        assert!(!blank_city.is_complete());
    }

    #[test]
    fn payment_method_roundtrip() {
        for m in [
            PaymentMethod::Card,
            PaymentMethod::BankTransfer,
            PaymentMethod::CashOnDelivery,
        ] {
            assert_eq!(PaymentMethod::parse(m.as_str()), Some(m));
        }
        assert_eq!(PaymentMethod::parse("barter"), None);
    }
}
