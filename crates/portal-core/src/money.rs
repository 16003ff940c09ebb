//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Integer Paise, Decimal Intermediates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE EACH REPRESENTATION LIVES                                        │
//! │                                                                         │
//! │  units consumed × rate per unit   →  rust_decimal::Decimal (exact)      │
//! │       350.000    ×     8.50                                             │
//! │                                                                         │
//! │  anything reported or persisted   →  Money (i64 paise)                  │
//! │       energy, fixed, subtotal, tax, total                               │
//! │                                                                         │
//! │  The ONLY bridge is `Money::from_decimal`, which rounds to 2 places     │
//! │  with round-half-away-from-zero (12.345 → 12.35, -12.345 → -12.35).     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use portal_core::money::Money;
//!
//! let fixed = Money::from_paise(5000); // ₹50.00
//! let total = fixed + Money::from_rupees_paise(2, 50);
//! assert_eq!(total.paise(), 5250);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Number of decimal places every monetary value is rounded to.
pub const MONEY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: bill adjustments may be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as an integer**: API clients format for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part carries the sign:
    /// `from_rupees_paise(-5, 50)` is -₹5.50.
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Rounds an exact decimal amount (in rupees) to paise.
    ///
    /// ## Rounding
    /// Half-away-from-zero at 2 decimal places. This is the single place in
    /// the workspace where decimal amounts become money.
    ///
    /// ## Example
    /// ```rust
    /// use portal_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let amount = Decimal::new(121_125, 3); // 121.125
    /// assert_eq!(Money::from_decimal(amount).unwrap().paise(), 12113);
    /// ```
    pub fn from_decimal(amount: Decimal) -> CoreResult<Self> {
        let rounded =
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        let paise = rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|p| p.to_i64())
            .ok_or(CoreError::AmountOverflow {
                amount: amount.to_string(),
            })?;
        Ok(Money(paise))
    }

    /// Returns the value as an exact decimal amount in rupees.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display is for logs and receipts; the portal UI does its own formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
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
