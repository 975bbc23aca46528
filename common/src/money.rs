use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Fixed-point decimal money, always normalized to exactly two fractional
/// digits. Floating point never appears on a balance anywhere in this
/// crate; every arithmetic path goes through `rust_decimal::Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Builds a `Money` from an already-trusted `Decimal` (e.g. one just
    /// read back from the database), normalizing scale to 2.
    pub fn from_decimal(value: Decimal) -> Self {
        Money(value.round_dp(2))
    }

    /// Parses caller-supplied input. Rejects negative amounts, non-finite
    /// values, and anything with more than two fractional digits — the
    /// same validation the transaction and wallet stores rely on to never
    /// see a malformed amount.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let decimal = Decimal::from_str(input.trim())
            .map_err(|_| DomainError::invalid_transaction(format!("not a decimal: {input}")))?;

        if decimal.is_sign_negative() {
            return Err(DomainError::invalid_transaction("amount must not be negative"));
        }
        if decimal.scale() > 2 {
            return Err(DomainError::invalid_transaction(
                "amount must have at most two fractional digits",
            ));
        }

        Ok(Money(decimal))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money::from_decimal)
            .ok_or_else(|| DomainError::internal("money addition overflowed"))
    }

    /// Subtracts `other` from `self`. Does not itself enforce
    /// non-negativity — the wallet store's `debit` precondition is the
    /// place that rejects an insufficient balance.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_sub(other.0)
            .map(Money::from_decimal)
            .ok_or_else(|| DomainError::internal("money subtraction overflowed"))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_amount() {
        let m = Money::parse("100.00").unwrap();
        assert_eq!(m.to_string(), "100.00");
    }

    #[test]
    fn rejects_negative_amount() {
        assert!(Money::parse("-5.00").is_err());
    }

    #[test]
    fn rejects_more_than_two_fractional_digits() {
        assert!(Money::parse("10.001").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Money::parse("not-a-number").is_err());
    }

    #[test]
    fn add_and_sub_round_trip() {
        let a = Money::parse("30.00").unwrap();
        let b = Money::parse("70.00").unwrap();
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum.to_string(), "100.00");
        let back = sum.checked_sub(a).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn from_decimal_normalizes_scale() {
        let m = Money::from_decimal(Decimal::from_str("5").unwrap());
        assert_eq!(m.to_string(), "5.00");
    }
}
