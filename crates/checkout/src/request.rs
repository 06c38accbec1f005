//! Validated order requests.
//!
//! The API boundary deserializes loosely-typed bodies into these structs
//! and validates them once; the ledger writer operates only on validated,
//! normalized input.

use common::{BuyerId, Money, ProductId};
use domain::{Address, PaymentMethod, PaymentStatus};

use crate::{CheckoutError, Result};

/// One requested order line. The owning store is resolved from the catalog
/// during validation, not trusted from the caller.
#[derive(Debug, Clone)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price at order time. Cart-driven checkouts pass the cart's snapshot.
    pub unit_price: Money,
}

/// A request to create one order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub buyer_id: BuyerId,
    pub lines: Vec<LineRequest>,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_cost: Money,
    pub tax: Money,
    /// Optional client key deduplicating retried submissions.
    pub idempotency_key: Option<String>,
}

impl OrderRequest {
    /// Rejects malformed input before any side effect.
    pub fn validate(&self) -> Result<()> {
        if self.lines.is_empty() {
            return Err(CheckoutError::Validation(
                "order has no line items".to_string(),
            ));
        }
        for line in &self.lines {
            if line.quantity == 0 {
                return Err(CheckoutError::Validation(format!(
                    "quantity for product {} must be at least 1",
                    line.product_id
                )));
            }
            if line.unit_price.is_negative() {
                return Err(CheckoutError::Validation(format!(
                    "unit price for product {} must not be negative",
                    line.product_id
                )));
            }
        }
        if !self.shipping_address.is_complete() {
            return Err(CheckoutError::Validation(
                "shipping address is incomplete".to_string(),
            ));
        }
        if self.shipping_cost.is_negative() {
            return Err(CheckoutError::Validation(
                "shipping cost must not be negative".to_string(),
            ));
        }
        if self.tax.is_negative() {
            return Err(CheckoutError::Validation(
                "tax must not be negative".to_string(),
            ));
        }
        if let Some(key) = &self.idempotency_key
            && key.trim().is_empty()
        {
            return Err(CheckoutError::Validation(
                "idempotency key must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            recipient: "A. Buyer".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    fn request(lines: Vec<LineRequest>) -> OrderRequest {
        OrderRequest {
            buyer_id: BuyerId::new(),
            lines,
            shipping_address: address(),
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Paid,
            shipping_cost: Money::zero(),
            tax: Money::zero(),
            idempotency_key: None,
        }
    }

    #[test]
    fn empty_lines_fail_validation() {
        let err = request(vec![]).validate().unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[test]
    fn zero_quantity_fails_validation() {
        let err = request(vec![LineRequest {
            product_id: ProductId::new(),
            quantity: 0,
            unit_price: Money::from_cents(100),
        }])
        .validate()
        .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
    }

    #[test]
    fn blank_idempotency_key_fails_validation() {
        let mut req = request(vec![LineRequest {
            product_id: ProductId::new(),
            quantity: 1,
            unit_price: Money::from_cents(100),
        }]);
        req.idempotency_key = Some("  ".to_string());
        assert!(matches!(
            req.validate().unwrap_err(),
            CheckoutError::Validation(_)
        ));
    }

    #[test]
    fn well_formed_request_passes() {
        let req = request(vec![LineRequest {
            product_id: ProductId::new(),
            quantity: 2,
            unit_price: Money::from_cents(100),
        }]);
        assert!(req.validate().is_ok());
    }
}
