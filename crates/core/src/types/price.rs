//! Type-safe price representation using decimal arithmetic.
//!
//! All prices in the shop are in yuan (CNY) with two decimal places.

use core::fmt;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in yuan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in fen (1/100 yuan).
    #[must_use]
    pub fn from_fen(fen: i64) -> Self {
        Self(Decimal::new(fen, 2))
    }

    /// The decimal amount in yuan.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `count` units at this unit price.
    #[must_use]
    pub fn times(self, count: i32) -> Self {
        Self(self.0 * Decimal::from(count))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_fen(1250).to_string(), "¥12.50");
        assert_eq!(Price::new(Decimal::from(3)).to_string(), "¥3.00");
    }

    #[test]
    fn test_times_and_add() {
        let unit = Price::from_fen(399);
        assert_eq!(unit.times(3), Price::from_fen(1197));
        assert_eq!(unit + Price::from_fen(1), Price::from_fen(400));
        assert_eq!(unit.times(0), Price::ZERO);
    }
}
