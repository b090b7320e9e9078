//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                     │
//! │                                                                 │
//! │  In floating point:                                             │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                   │
//! │                                                                 │
//! │  OUR SOLUTION: Integer Paisa                                    │
//! │    Tk 10.00 = 1000 paisa; every sum, refund and due figure is   │
//! │    exact integer arithmetic. Where a fractional quantity forces │
//! │    rounding (rate × 2.38 bars) we round ONCE, at the paisa,     │
//! │    and the rounded value is what gets stored.                   │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The 2-decimal money policy is structural: a paisa is the smallest
//! representable amount, so nothing downstream can accumulate sub-paisa
//! drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::quantity::Quantity;

/// Rounds `n / d` half away from zero. `d` must be positive.
pub(crate) const fn div_round(n: i128, d: i128) -> i128 {
    let half = d / 2;
    if n >= 0 {
        (n + half) / d
    } else {
        -((-n + half) / d)
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paisa (1/100 BDT).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and corrections
/// - **Single-field tuple struct**: Zero-cost abstraction over i64
/// - **Never constructed from raw floats inside the engines**: the only
///   float boundary is [`Money::from_bdt_f64`], used when quantizing
///   caller-supplied JSON amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paisa (the smallest currency unit).
    #[inline]
    pub const fn from_paisa(paisa: i64) -> Self {
        Money(paisa)
    }

    /// Creates a Money value from whole BDT.
    #[inline]
    pub const fn from_bdt(bdt: i64) -> Self {
        Money(bdt * 100)
    }

    /// Quantizes a caller-supplied decimal amount to paisa.
    ///
    /// This is the single float-to-money boundary: payloads arrive as
    /// decimal BDT (`1800.0`, `66.5`) and are rounded half away from
    /// zero to 2 decimal places here, before any arithmetic happens.
    pub fn from_bdt_f64(amount: f64) -> Self {
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value in paisa.
    #[inline]
    pub const fn paisa(&self) -> i64 {
        self.0
    }

    /// Returns the whole-BDT portion.
    #[inline]
    pub const fn bdt(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paisa portion (always 0-99).
    #[inline]
    pub const fn paisa_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value as decimal BDT, for display/report payloads only.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative amounts to zero.
    ///
    /// Used for due figures: refunds plus installments can net below
    /// zero arithmetically, but a due is never negative.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Multiplies a per-unit amount by a (possibly fractional) quantity.
    ///
    /// Integer math throughout: `paisa × milli / 1000`, rounded half
    /// away from zero at the paisa. This is the line-total and refund
    /// formula (`rate × qty`).
    ///
    /// ## Example
    /// ```rust
    /// use karbar_core::money::Money;
    /// use karbar_core::quantity::Quantity;
    ///
    /// let rate = Money::from_bdt(22);          // Tk 22 / sqft
    /// let qty = Quantity::from_f64(3.0);       // 3 sqft
    /// assert_eq!(rate.mul_quantity(qty), Money::from_bdt(66));
    /// ```
    pub fn mul_quantity(&self, qty: Quantity) -> Money {
        let paisa = div_round(self.0 as i128 * qty.milli() as i128, 1000);
        Money(paisa as i64)
    }

    /// Derives a per-unit rate from a whole-line amount.
    ///
    /// Used to back-compute an `effective_rate` for audit display when
    /// a refund override supersedes the rate-derived computation.
    /// Quantity must be non-zero; callers validate that first.
    pub fn per_unit(&self, qty: Quantity) -> Money {
        if qty.is_zero() {
            return Money::zero();
        }
        let paisa = div_round(self.0 as i128 * 1000, qty.milli().abs() as i128);
        Money(paisa as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display for debugging and log output. Receipt formatting belongs to
/// the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Tk {}.{:02}", sign, self.bdt().abs(), self.paisa_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
