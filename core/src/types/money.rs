//! The `money_json` object embedded as the third pipe-segment of a
//! microformat string.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A spendable amount, its currency code, and its original owner's IXAN.
///
/// `amount` is a `Decimal` rather than a float so that the Proof-of-
/// Diplomacy engine's `total_amount` summation (§4.4) is exact, never an
/// approximation compounded across many transactions in a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Money {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
    pub owner: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            owner: owner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_through_json() {
        let money = Money::new(dec!(1000.5), "NGN", "000000000001");
        let json = serde_json::to_string(&money).unwrap();
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(money, back);
    }

    #[test]
    fn amount_is_serialized_as_decimal_string() {
        let money = Money::new(dec!(0.0001), "NGN", "000000000001");
        let json = serde_json::to_string(&money).unwrap();
        assert!(json.contains(r#""amount":"0.0001""#));
    }
}
