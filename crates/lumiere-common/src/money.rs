//! Exact monetary amounts.
//!
//! Amounts are held as integer cents so that cart totals, tax and discounts
//! never accumulate floating point drift. On the wire a [`Money`] is a plain
//! JSON number in dollars (`92.5`), which keeps the document shape the
//! storefront UI already speaks.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Round a dollar figure to the nearest cent (half away from zero).
    pub fn from_dollars(dollars: f64) -> Self {
        if !dollars.is_finite() {
            return Self::ZERO;
        }
        Self((dollars * 100.0).round() as i64)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Multiply by a fractional rate (`0.08` for 8%) and round to cents.
    pub fn percent(self, rate: f64) -> Self {
        Self((self.0 as f64 * rate).round() as i64)
    }

    /// Scale by `numerator / denominator`, rounding to the nearest cent.
    pub fn scale(self, numerator: u32, denominator: u32) -> Self {
        if denominator == 0 {
            return Self::ZERO;
        }
        let scaled = self.0 as f64 * f64::from(numerator) / f64::from(denominator);
        Self(scaled.round() as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<u32> for Money {
    type Output = Money;

    fn mul(self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_dollars())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        Ok(Money::from_dollars(dollars))
    }
}
