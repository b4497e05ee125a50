//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! Every amount the engine touches (catalog prices, minimum purchases,
//! fixed discounts, caps, totals) is an integer count of cents. Decimal
//! strings appear only at the edges: admin input is parsed with
//! [`Money::from_str`] and display goes through [`Money::to_decimal_string`].
//! `1999 × 3` is `5997` cents with no drift to round away.
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // 10.99
//!
//! // Or parse an admin-entered decimal string
//! let minimum: Money = "50".parse().unwrap();
//! assert_eq!(minimum.cents(), 5000);
//!
//! // Arithmetic operations
//! let doubled = price * 2;
//! assert_eq!(doubled.to_decimal_string(), "21.98");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// Signed so that subtraction stays total; negative prices and discounts
/// are rejected by validation rather than by the type. Serializes as a
/// bare integer of cents.
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Catalog price ──► LineItem.unit_price ──► line_total ──► subtotal      │
/// │                                                              │          │
/// │  Coupon rule ────────────────────────────► discount ◄────────┘          │
/// │                                               │                         │
/// │                                               ▼                         │
/// │                                  total = subtotal - discount            │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
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

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_mul_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Computes `rate` percent of this amount, rounded half-up to the cent.
    ///
    /// This is the only place a fractional cent can appear in pricing, and
    /// it is rounded exactly once.
    ///
    /// ## Implementation
    /// Integer math in i128: `(cents * bps + 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    /// use storefront_core::types::Percentage;
    ///
    /// let subtotal = Money::from_cents(10000);
    /// let ten_percent = Percentage::from_bps(1000);
    /// assert_eq!(subtotal.percentage(ten_percent).cents(), 1000);
    ///
    /// // 12.5% of 0.99 = 0.12375 → 0.12
    /// let odd = Money::from_cents(99).percentage(Percentage::from_bps(1250));
    /// assert_eq!(odd.cents(), 12);
    /// ```
    pub fn percentage(&self, rate: Percentage) -> Money {
        let magnitude = (self.0.unsigned_abs() as i128 * rate.bps() as i128 + 5000) / 10000;
        // Only an unvalidated rate above 100% can leave the i64 range.
        let magnitude = i64::try_from(magnitude).unwrap_or(i64::MAX);
        if self.0 < 0 {
            Money(-magnitude)
        } else {
            Money(magnitude)
        }
    }

    /// Formats as a plain two-decimal string (`"1099"` cents → `"10.99"`).
    ///
    /// This is the presentation boundary: use it for receipts and JSON
    /// payloads that want human-readable amounts.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses a decimal amount with at most two fractional digits.
///
/// Accepted: `"10"`, `"10.5"`, `"10.50"`, `"-3.25"`, `"0.99"`.
/// Rejected: `""`, `"1.234"`, `"1e3"`, `"12,50"`, `"."`.
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

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty() && minor_str.is_empty() {
            return Err(invalid("must be a decimal number"));
        }
        if minor_str.len() > 2 {
            return Err(invalid("at most two decimal places are allowed"));
        }
        if !major_str.chars().all(|c| c.is_ascii_digit())
            || !minor_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a decimal number"));
        }

        let major: i64 = if major_str.is_empty() {
            0
        } else {
            major_str.parse().map_err(|_| invalid("amount is too large"))?
        };
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| invalid("must be a decimal number"))? * 10,
            _ => minor_str.parse().map_err(|_| invalid("must be a decimal number"))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows a dollar-prefixed amount, for logs and debugging.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor())
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

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_decimal_string() {
        assert_eq!(Money::from_cents(9000).to_decimal_string(), "90.00");
        assert_eq!(Money::from_cents(5).to_decimal_string(), "0.05");
        assert_eq!(Money::from_cents(-1).to_decimal_string(), "-0.01");
    }

    #[test]
    fn test_parse() {
        assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("10.05".parse::<Money>().unwrap().cents(), 1005);
        assert_eq!(".99".parse::<Money>().unwrap().cents(), 99);
        assert_eq!(" 0.99 ".parse::<Money>().unwrap().cents(), 99);
        assert_eq!("-3.25".parse::<Money>().unwrap().cents(), -325);

        assert!("".parse::<Money>().is_err());
        assert!(".".parse::<Money>().is_err());
        assert!("1.234".parse::<Money>().is_err());
        assert!("1e3".parse::<Money>().is_err());
        assert!("12,50".parse::<Money>().is_err());
        assert!("99999999999999999999".parse::<Money>().is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(
            Money::from_cents(1).checked_add(Money::from_cents(2)),
            Some(Money::from_cents(3))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MAX / 2 + 1).checked_mul_quantity(2), None);
    }

    #[test]
    fn test_percentage_rounding() {
        // 10% of 100.00
        assert_eq!(
            Money::from_cents(10000).percentage(Percentage::from_bps(1000)).cents(),
            1000
        );
        // 15% of 0.10 = 0.015 → 0.02 (half-up)
        assert_eq!(
            Money::from_cents(10).percentage(Percentage::from_bps(1500)).cents(),
            2
        );
        // 0% and 100%
        assert!(Money::from_cents(4321).percentage(Percentage::zero()).is_zero());
        assert_eq!(
            Money::from_cents(4321).percentage(Percentage::from_bps(10000)).cents(),
            4321
        );
    }

    /// Summing the same prices any number of times never drifts.
    #[test]
    fn test_no_drift_on_repeated_sums() {
        let price = Money::from_cents(10); // 0.10
        let mut total = Money::zero();
        for _ in 0..1000 {
            total += price;
        }
        assert_eq!(total.cents(), 10000);
        assert_eq!(total.to_decimal_string(), "100.00");
    }
}
