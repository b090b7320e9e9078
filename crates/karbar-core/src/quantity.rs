//! # Quantity Module
//!
//! Provides the `Quantity` type for stock and sale quantities.
//!
//! Quantities follow a 3-decimal policy: the canonical representation
//! is integer milliunits (1/1000 of a unit), so `2.5 sqft` is 2500
//! milli and `0.5 sheet` is 500 milli. Making the precision structural
//! means the anti-over-return comparison is plain integer arithmetic
//! with no epsilon juggling: two quantities that round to the same 3
//! decimals ARE the same quantity.
//!
//! Base units (sheet, bar, pipe, piece) are indivisible when transacted
//! directly; [`Quantity::is_whole`] backs that rule. Alternate units
//! (sqft, ft) may be fractional.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// =============================================================================
// Quantity Type
// =============================================================================

/// A quantity in milliunits (1/1000 of a unit of measure).
///
/// Signed: restock corrections may carry negative deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from milliunits.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 1000)
    }

    /// Quantizes a caller-supplied decimal quantity to 3 decimal places.
    ///
    /// The single float-to-quantity boundary, mirroring
    /// [`crate::money::Money::from_bdt_f64`]. Rounds half away from zero.
    pub fn from_f64(qty: f64) -> Self {
        Quantity((qty * 1000.0).round() as i64)
    }

    /// Returns the value in milliunits.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Returns the quantity as a float, for conversion math and report
    /// payloads.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Zero quantity.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Whether this quantity is a whole number of units.
    ///
    /// Base-unit transactions (sheets, bars, pipes, pieces) must be
    /// whole; `2.5 sheets` is rejected while `2.5 sqft` is fine.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % 1000 == 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Quantity(self.0.abs())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Displays with the full 3-decimal precision: `2.500`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:03}", sign, (self.0 / 1000).abs(), (self.0 % 1000).abs())
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        iter.fold(Quantity::zero(), |a, b| a + b)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_quantizes() {
        assert_eq!(Quantity::from_f64(2.5).milli(), 2500);
        assert_eq!(Quantity::from_f64(0.0005).milli(), 1);
        assert_eq!(Quantity::from_f64(-1.25).milli(), -1250);
        // 19.999 ft stays 19.999, never rounds up to 20
        assert_eq!(Quantity::from_f64(19.999).milli(), 19999);
    }

    #[test]
    fn test_is_whole() {
        assert!(Quantity::from_f64(3.0).is_whole());
        assert!(Quantity::zero().is_whole());
        assert!(!Quantity::from_f64(2.5).is_whole());
        assert!(!Quantity::from_milli(1).is_whole());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Quantity::from_f64(2.5)), "2.500");
        assert_eq!(format!("{}", Quantity::from_units(10)), "10.000");
        assert_eq!(format!("{}", Quantity::from_milli(-1250)), "-1.250");
        assert_eq!(format!("{}", Quantity::from_milli(5)), "0.005");
    }

    #[test]
    fn test_arithmetic() {
        let a = Quantity::from_f64(1.0);
        let b = Quantity::from_f64(0.5);
        assert_eq!((a - b).milli(), 500);
        assert_eq!((a + b).milli(), 1500);
        assert_eq!((-b).milli(), -500);
    }

    #[test]
    fn test_sum() {
        let total: Quantity = [1000, 500, 250]
            .iter()
            .map(|m| Quantity::from_milli(*m))
            .sum();
        assert_eq!(total.milli(), 1750);
    }
}
