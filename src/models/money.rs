//! Money type for representing currency amounts
//!
//! Internally stores amounts in cents (u64) to avoid floating-point precision
//! issues. Amounts are never negative; parsing only accepts `int.dd`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};

/// Represents a non-negative monetary amount stored as cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Create a Money amount from cents
    ///
    /// # Examples
    /// ```
    /// use budget_ledger::models::Money;
    /// let amount = Money::from_cents(1050); // $10.50
    /// ```
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Create a Money amount from dollars and cents
    pub const fn from_dollars_cents(dollars: u64, cents: u64) -> Self {
        Self(dollars * 100 + cents)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in cents
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Get the whole dollars portion
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Get the cents portion (0-99)
    pub const fn cents_part(&self) -> u64 {
        self.0 % 100
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtract, returning `None` if the result would be negative
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Subtract, flooring at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Parse a money amount from a string
    ///
    /// Accepts exactly `{digits}.{digit}{digit}`, e.g. "10.50" or "0.05".
    /// Signs, currency symbols, missing or extra fraction digits are rejected.
    pub fn parse(s: &str) -> LedgerResult<Self> {
        let invalid = || LedgerError::invalid("money", s);

        let (whole, fraction) = s.split_once('.').ok_or_else(invalid)?;
        if whole.is_empty()
            || fraction.len() != 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let dollars: u64 = whole.parse().map_err(|_| invalid())?;
        let cents: u64 = fraction.parse().map_err(|_| invalid())?;

        dollars
            .checked_mul(100)
            .and_then(|d| d.checked_add(cents))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Canonical `int.dd` text, the inverse of [`Money::parse`]
    pub fn to_plain_string(&self) -> String {
        format!("{}.{:02}", self.dollars(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.cents_part())
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
