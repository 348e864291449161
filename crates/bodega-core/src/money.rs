//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Average cost in floating point:                                        │
//! │    3000.0 / 20.0 * 5.0 drifts once values stop being "nice"  ❌         │
//! │                                                                         │
//! │  Stock value after selling everything:                                  │
//! │    1000 - 333.33 - 333.33 - 333.33 = 0.01 → ghost value left behind!   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + Proration                                │
//! │    cogs = stock_value × qty / stock (rounded once, 128-bit math)        │
//! │    The last unit out always carries exactly the remaining value        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bodega_core::money::Money;
//!
//! // Create from cents (preferred)
//! let unit_cost = Money::from_cents(1099); // $10.99
//!
//! // Arithmetic operations
//! let lot_value = unit_cost * 3i64;                 // $32.97
//! let total = unit_cost + Money::from_cents(500);   // $15.99
//!
//! // NEVER do this:
//! // let bad = Money::from_float(10.99); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: VAT payable can be negative (a credit for the period)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Batch.unit_cost ──► inbound: stock_value += qty × unit_cost            │
/// │                                                                         │
/// │  Product.stock_value ──► outbound: cogs = prorate(qty, stock)           │
/// │                                                                         │
/// │  sale price × qty ──► net ──► TaxBreakdown { net, iva, total }          │
/// │                                                                         │
/// │  Movement.iva ──► monthly VAT report (output - input)                   │
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
    /// use bodega_core::money::Money;
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
    /// use bodega_core::money::Money;
    ///
    /// let price = Money::from_major_minor(10, 99);
    /// assert_eq!(price.cents(), 1099);
    ///
    /// let credit = Money::from_major_minor(-5, 50);
    /// assert_eq!(credit.cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates tax rounding half up.
    ///
    /// ## Implementation
    /// We use integer math: `(amount * rate + 5000) / 10000`
    /// The +5000 provides rounding (5000/10000 = 0.5)
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    /// use bodega_core::types::TaxRate;
    ///
    /// let net = Money::from_cents(1000);
    /// let iva = net.calculate_tax(TaxRate::from_bps(1900));
    /// assert_eq!(iva.cents(), 190);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 so large nets cannot overflow before the division
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    ///
    /// let unit_cost = Money::from_cents(299);
    /// assert_eq!(unit_cost.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `self × qty`, or `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self + other`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `self × part / whole`, rounded half up.
    ///
    /// This is the weighted-average share of a pool of value: the cost of
    /// `part` units out of `whole` units worth `self` in total. Taking the
    /// whole pool always returns exactly `self`.
    ///
    /// Returns zero when `whole` is not positive (average cost is undefined
    /// for an empty pool).
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    ///
    /// let stock_value = Money::from_cents(1000);
    /// assert_eq!(stock_value.prorate(1, 3).cents(), 333);
    /// assert_eq!(stock_value.prorate(2, 3).cents(), 667);
    /// assert_eq!(stock_value.prorate(3, 3).cents(), 1000);
    /// ```
    pub fn prorate(&self, part: i64, whole: i64) -> Money {
        if whole <= 0 {
            return Money::zero();
        }
        let numerator = self.0 as i128 * part as i128;
        let whole = whole as i128;
        // Half up away from zero, symmetric for negative pools
        let rounded = if numerator >= 0 {
            (2 * numerator + whole) / (2 * whole)
        } else {
            -((-2 * numerator + whole) / (2 * whole))
        };
        Money::from_cents(rounded as i64)
    }
}

// =============================================================================
// Tax Breakdown
// =============================================================================

/// Net / VAT / total split of a sale or purchase line.
///
/// ```text
/// net = unit price × quantity
/// iva = round_half_up(net × rate)
/// total = net + iva
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub net: Money,
    pub iva: Money,
    pub total: Money,
}

impl TaxBreakdown {
    /// Splits a net amount at the given rate.
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::{Money, TaxBreakdown};
    /// use bodega_core::VAT_RATE;
    ///
    /// let line = TaxBreakdown::from_net(Money::from_cents(1000), VAT_RATE);
    /// assert_eq!(line.iva.cents(), 190);
    /// assert_eq!(line.total.cents(), 1190);
    /// ```
    pub fn from_net(net: Money, rate: TaxRate) -> Self {
        let iva = net.calculate_tax(rate);
        TaxBreakdown {
            net,
            iva,
            total: net + iva,
        }
    }

    /// Breakdown for `quantity` units at `unit_price` (net of tax).
    ///
    /// `None` when the net or the total does not fit in an `i64` of cents.
    pub fn for_line(unit_price: Money, quantity: i64, rate: TaxRate) -> Option<Self> {
        let net = unit_price.checked_multiply_quantity(quantity)?;
        let iva = net.calculate_tax(rate);
        Some(TaxBreakdown {
            net,
            iva,
            total: net.checked_add(iva)?,
        })
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. The UI formats amounts itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summing an iterator of amounts (report totals).
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
