//! # Money Module
//!
//! Provides the `Money` type for handling euro amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CASH RECONCILIATION NEEDS EXACT ARITHMETIC                             │
//! │                                                                         │
//! │  running cash = initial + sales cash + deposits − withdrawals           │
//! │                                                                         │
//! │  With floats, 0.10 + 0.20 − 0.30 ≠ 0 and a withdrawal of the full       │
//! │  drawer could be rejected (or accepted) by a rounding error.            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer cents                                            │
//! │    1000 + 2000 − 3000 = 0, always                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tpv_core::money::Money;
//!
//! let float = Money::from_cents(5000); // 50.00€
//! let total = float + Money::from_cents(2500);
//! assert_eq!(total.to_string(), "75.00€");
//!
//! let parsed: Money = "12.5".parse().unwrap();
//! assert_eq!(parsed.cents(), 1250);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in euro cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: differences (declared vs projected cash) can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **sqlx transparent**: stored as a plain INTEGER column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use tpv_core::money::Money;
    ///
    /// let amount = Money::from_cents(1099); // 10.99€
    /// assert_eq!(amount.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole euros.
    #[inline]
    pub const fn from_euros(euros: i64) -> Self {
        Money(euros * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-euro portion.
    #[inline]
    pub const fn euros(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cent portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use tpv_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `self × qty`, or `None` when the product does not fit.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self × qty`, clamped at the representable bounds.
    #[inline]
    pub const fn saturating_multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `self + other`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self - other`, or `None` on overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self + other`, clamped at the representable bounds.
    #[inline]
    pub const fn saturating_add(self, other: Money) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Applies a percentage discount given in basis points (1000 = 10%).
    ///
    /// The kept share `self × (10000 − bps) / 10000` is rounded to the
    /// nearest cent, half away from zero. Discounts above 100% count as 100%.
    ///
    /// ```rust
    /// use tpv_core::money::Money;
    ///
    /// let line = Money::from_cents(10000);
    /// assert_eq!(line.apply_percentage_discount(5000).cents(), 5000);
    /// // 0.15€ at 50% = 0.075€ → 0.08€
    /// assert_eq!(Money::from_cents(15).apply_percentage_discount(5000).cents(), 8);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        let kept_bps = 10_000 - i128::from(discount_bps.min(10_000));
        let scaled = i128::from(self.0) * kept_bps;
        let half = if scaled < 0 { -5_000 } else { 5_000 };
        // |result| <= |self|, so the narrowing cannot truncate
        Money::from_cents(((scaled + half) / 10_000) as i64)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses operator input such as `75`, `75.5`, `75.50` or `-3.20`.
///
/// At most two decimals are accepted; `,` is not a decimal separator.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number like 12.50"));
        }
        if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("at most two decimal places are allowed"));
        }
        if digits.ends_with('.') {
            return Err(invalid("missing decimals after '.'"));
        }

        let euros: i64 = whole.parse().map_err(|_| invalid("amount is too large"))?;
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("bad decimals"))? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid("bad decimals"))?,
        };

        let total = euros
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -total } else { total }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders `12.50€` / `-12.50€`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}€", sign, self.euros().abs(), self.cents_part())
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
