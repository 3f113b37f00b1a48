//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Both types reject negative values at construction; arithmetic that could
//! go negative is exposed through checked operations only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// A strictly positive execution or limit price
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price, returning None unless the value is > 0
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create a price from an integer value
    ///
    /// # Panics
    /// Panics if the value is zero
    pub fn from_u64(value: u64) -> Self {
        Self::try_new(Decimal::from(value)).expect("price must be positive")
    }

    /// Parse a price from a decimal string
    pub fn from_str(s: &str) -> Option<Self> {
        Decimal::from_str(s).ok().and_then(Self::try_new)
    }

    /// Get the underlying decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative order or trade quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a quantity, returning None if the value is negative
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    /// The zero quantity
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Parse a quantity from a decimal string
    pub fn from_str(s: &str) -> Option<Self> {
        Decimal::from_str(s).ok().and_then(Self::try_new)
    }

    /// Get the underlying decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Check if the quantity is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtract, returning None if the result would be negative
    pub fn checked_sub(&self, other: Quantity) -> Option<Self> {
        Self::try_new(self.0 - other.0)
    }

    /// The smaller of two quantities
    pub fn min(self, other: Quantity) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notional value of a fill: price × quantity
pub fn notional(price: Price, quantity: Quantity) -> Decimal {
    price.as_decimal() * quantity.as_decimal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_rejects_non_positive() {
        assert!(Price::try_new(Decimal::ZERO).is_none());
        assert!(Price::try_new(Decimal::from(-5)).is_none());
        assert!(Price::try_new(Decimal::ONE).is_some());
    }

    #[test]
    fn test_price_from_str() {
        let price = Price::from_str("3000.50").unwrap();
        assert_eq!(price.as_decimal(), Decimal::new(300050, 2));
        assert!(Price::from_str("-1").is_none());
        assert!(Price::from_str("garbage").is_none());
    }

    #[test]
    fn test_price_ordering() {
        assert!(Price::from_u64(50000) > Price::from_u64(49000));
        assert_eq!(Price::from_u64(100), Price::from_str("100").unwrap());
    }

    #[test]
    fn test_quantity_rejects_negative() {
        assert!(Quantity::try_new(Decimal::from(-1)).is_none());
        assert!(Quantity::try_new(Decimal::ZERO).is_some());
    }

    #[test]
    fn test_quantity_arithmetic() {
        let a = Quantity::from_str("1.5").unwrap();
        let b = Quantity::from_str("0.5").unwrap();

        assert_eq!(a + b, Quantity::from_str("2.0").unwrap());
        assert_eq!(a.checked_sub(b), Quantity::from_str("1.0"));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(a.min(b), b);
    }

    #[test]
    fn test_quantity_zero() {
        assert!(Quantity::zero().is_zero());
        assert!(!Quantity::from_str("0.1").unwrap().is_zero());
    }

    #[test]
    fn test_notional() {
        let value = notional(
            Price::from_u64(50000),
            Quantity::from_str("0.5").unwrap(),
        );
        assert_eq!(value, Decimal::from(25000));
    }

    #[test]
    fn test_serialization_round_trip() {
        let price = Price::from_str("123.456").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(price, back);
    }
}
