//! Value types carried in event payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Money amount in cents (to avoid floating point issues)
///
/// Arithmetic saturates instead of overflowing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a new money amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a new money amount from whole currency units (converted to
    /// cents, saturating at the bounds of `i64`)
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units.saturating_mul(100))
    }

    /// Returns the value in cents
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Totals of a recorded sale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line prices before tax
    pub subtotal: Money,
    /// Tax charged on the subtotal
    pub tax: Money,
    /// Gratuity added by the guest
    pub tip: Money,
    /// Amount due (subtotal + tax + tip)
    pub total: Money,
}

impl Totals {
    /// Builds totals, computing `total` from its parts.
    ///
    /// ```
    /// use mise_core::types::{Money, Totals};
    ///
    /// let totals = Totals::new(Money::from_cents(1000), Money::from_cents(80), Money::from_cents(150));
    /// assert_eq!(totals.total, Money::from_cents(1230));
    /// ```
    #[must_use]
    pub fn new(subtotal: Money, tax: Money, tip: Money) -> Self {
        Self {
            subtotal,
            tax,
            tip,
            total: subtotal + tax + tip,
        }
    }
}

/// Who processes a payment attempt.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    /// Cash drawer
    Cash,
    /// Integrated card terminal
    Card,
    /// House gift card
    GiftCard,
    /// Third-party processor, by name
    External(String),
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => f.write_str("cash"),
            Self::Card => f.write_str("card"),
            Self::GiftCard => f.write_str("gift_card"),
            Self::External(name) => write!(f, "external:{name}"),
        }
    }
}
