//! Monetary amounts in minor currency units.

use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Non-negative monetary amount in the smallest currency unit (e.g. cents).
///
/// Arithmetic saturates instead of wrapping; a catalog price times a bounded
/// quantity never comes near `u64::MAX` in practice.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Line total for `quantity` units at this unit price.
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(u64::from(quantity)))
    }

    /// Amount as a float in minor units (for ratio computations).
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl ValueObject for Money {}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Render a (possibly fractional, possibly negative) minor-unit amount with two
/// decimals, e.g. `-250.0` -> `"-2.50"`.
pub fn format_minor_units(amount: f64) -> String {
    let cents = amount.round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_multiplies_unit_price() {
        assert_eq!(Money::from_minor(250).times(3), Money::from_minor(750));
        assert_eq!(Money::from_minor(250).times(0), Money::ZERO);
    }

    #[test]
    fn arithmetic_saturates() {
        let max = Money::from_minor(u64::MAX);
        assert_eq!(max + Money::from_minor(1), max);
        assert_eq!(max.times(2), max);
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [100, 250, 5].into_iter().map(Money::from_minor).sum();
        assert_eq!(total, Money::from_minor(355));
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_minor(500).to_string(), "5.00");
        assert_eq!(Money::from_minor(1207).to_string(), "12.07");
    }

    #[test]
    fn format_minor_units_handles_sign_and_rounding() {
        assert_eq!(format_minor_units(2500.0), "25.00");
        assert_eq!(format_minor_units(-250.0), "-2.50");
        assert_eq!(format_minor_units(33.3), "0.33");
        assert_eq!(format_minor_units(-0.2), "0.00");
    }
}
