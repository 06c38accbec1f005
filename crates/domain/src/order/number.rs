//! Human-readable order numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Globally unique, human-readable order number: `ORD-<millis>-<3digit>`.
///
/// The random suffix keeps collision probability negligible, but callers
/// creating orders must still retry generation if the number is taken.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh order number for the given timestamp.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        let suffix = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % 1000;
        Self(format!("ORD-{}-{:03}", now.timestamp_millis(), suffix))
    }

    /// Wraps an existing order number (e.g. loaded from storage).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_ord_millis_suffix() {
        let now = Utc::now();
        let number = OrderNumber::generate(now);
        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 3);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn consecutive_numbers_differ() {
        let now = Utc::now();
        // Same millisecond: the random suffix still separates them
        // (1-in-1000 flake is acceptable for this sanity check).
        let a = OrderNumber::generate(now);
        let b = OrderNumber::generate(now);
        let c = OrderNumber::generate(now);
        assert!(a != b || b != c);
    }
}
