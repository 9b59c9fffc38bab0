//! Type-safe price representation in integer minor currency units.
//!
//! Catalog records store prices as whole numbers of the smallest currency
//! unit, so `Price` wraps an `i64` instead of a floating-point or decimal
//! type. Arithmetic that could overflow (line totals) is checked.

use serde::{Deserialize, Serialize};

/// A price in minor currency units (e.g., cents for USD).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(0);

    /// Create a price from minor currency units.
    #[must_use]
    pub const fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    /// Get the underlying amount in minor units.
    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Line total for `quantity` units, saturating on overflow.
    ///
    /// Quantities and catalog prices are small in practice; saturation keeps
    /// cart totals well-defined on adversarial input without panicking.
    #[must_use]
    pub const fn times(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }

    /// Sum two prices, saturating on overflow.
    #[must_use]
    pub const fn plus(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl From<i64> for Price {
    fn from(units: i64) -> Self {
        Self(units)
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let price = Price::from_minor_units(1099);
        assert_eq!(price.times(3).minor_units(), 3297);
    }

    #[test]
    fn test_times_saturates() {
        let price = Price::from_minor_units(i64::MAX);
        assert_eq!(price.times(2).minor_units(), i64::MAX);
    }

    #[test]
    fn test_serde_transparent() {
        let price = Price::from_minor_units(895);
        assert_eq!(serde_json::to_string(&price).expect("serialize"), "895");
    }
}
