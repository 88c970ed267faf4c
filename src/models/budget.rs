//! Budget value types
//!
//! A category budget caps spending in one category. A recurrence schedules
//! the periodic reset of running totals.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entry::validate_category;
use super::money::Money;
use crate::error::{LedgerError, LedgerResult};

/// Spending cap and running total for a single category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBudget {
    category: String,
    cap: Money,
    spent: Money,
}

impl CategoryBudget {
    /// Create a category budget with nothing spent yet
    pub fn new(category: impl Into<String>, cap: Money) -> LedgerResult<Self> {
        let category = category.into();
        validate_category(&category)?;
        Ok(Self {
            category,
            cap,
            spent: Money::zero(),
        })
    }

    /// Return a copy carrying the given running total
    pub fn with_spent(mut self, spent: Money) -> Self {
        self.spent = spent;
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn cap(&self) -> Money {
        self.cap
    }

    pub fn spent(&self) -> Money {
        self.spent
    }

    /// Check if spending is still within the cap
    pub fn is_within_cap(&self) -> bool {
        self.spent <= self.cap
    }

    pub(crate) fn record(&mut self, cost: Money) {
        self.spent += cost;
    }

    pub(crate) fn unrecord(&mut self, cost: Money) {
        self.spent = self.spent.saturating_sub(cost);
    }

    pub(crate) fn clear_spending(&mut self) {
        self.spent = Money::zero();
    }
}

impl fmt::Display for CategoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} of {}", self.category, self.spent, self.cap)
    }
}

/// Schedule for resetting running totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    next: DateTime<Utc>,
    interval_secs: i64,
}

impl Recurrence {
    /// Create a schedule whose first reset is at `next`
    pub fn new(next: DateTime<Utc>, interval_secs: i64) -> LedgerResult<Self> {
        if interval_secs <= 0 || TimeDelta::try_seconds(interval_secs).is_none() {
            return Err(LedgerError::invalid(
                "recurrence interval",
                interval_secs.to_string(),
            ));
        }
        Ok(Self {
            next,
            interval_secs,
        })
    }

    /// Create a schedule whose first reset is one interval after `now`
    pub fn starting_at(now: DateTime<Utc>, interval_secs: i64) -> LedgerResult<Self> {
        let schedule = Self::new(now, interval_secs)?;
        let next = now
            .checked_add_signed(schedule.interval())
            .ok_or_else(|| LedgerError::invalid("recurrence interval", interval_secs.to_string()))?;
        Ok(Self { next, ..schedule })
    }

    pub fn next(&self) -> DateTime<Utc> {
        self.next
    }

    pub fn interval_secs(&self) -> i64 {
        self.interval_secs
    }

    fn interval(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.interval_secs).unwrap_or_else(TimeDelta::zero)
    }

    /// Check whether a reset is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next
    }

    /// Advance `next` past `now`, returning how many periods elapsed
    ///
    /// Returns 0 and leaves the schedule untouched when no reset is due.
    pub(crate) fn catch_up(&mut self, now: DateTime<Utc>) -> i64 {
        if !self.is_due(now) {
            return 0;
        }

        let elapsed = (now - self.next).num_seconds();
        let periods = elapsed / self.interval_secs + 1;

        let advanced = periods
            .checked_mul(self.interval_secs)
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| self.next.checked_add_signed(delta));

        self.next = match advanced {
            Some(next) => next,
            None => now.checked_add_signed(self.interval()).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DAY: i64 = 86_400;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_category_budget() {
        let mut budget = CategoryBudget::new("Food", Money::from_cents(1000)).unwrap();
        assert_eq!(budget.spent(), Money::zero());

        budget.record(Money::from_cents(1200));
        assert!(!budget.is_within_cap());

        budget.unrecord(Money::from_cents(5000));
        assert_eq!(budget.spent(), Money::zero());
        assert!(CategoryBudget::new("", Money::zero()).is_err());
    }

    #[test]
    fn test_recurrence_rejects_non_positive_interval() {
        assert!(Recurrence::new(t0(), 0).is_err());
        assert!(Recurrence::new(t0(), -5).is_err());
        assert!(Recurrence::new(t0(), i64::MAX).is_err());
    }

    #[test]
    fn test_starting_at() {
        let schedule = Recurrence::starting_at(t0(), DAY).unwrap();
        assert_eq!(schedule.next(), t0() + TimeDelta::try_seconds(DAY).unwrap());
    }

    #[test]
    fn test_catch_up_not_due() {
        let mut schedule = Recurrence::new(t0(), DAY).unwrap();
        let before = t0() - TimeDelta::try_seconds(1).unwrap();
        assert_eq!(schedule.catch_up(before), 0);
        assert_eq!(schedule.next(), t0());
    }

    #[test]
    fn test_catch_up_exactly_due() {
        let mut schedule = Recurrence::new(t0(), DAY).unwrap();
        assert_eq!(schedule.catch_up(t0()), 1);
        assert_eq!(schedule.next(), t0() + TimeDelta::try_seconds(DAY).unwrap());
    }

    #[test]
    fn test_catch_up_multiple_periods() {
        let mut schedule = Recurrence::new(t0(), DAY).unwrap();
        let now = t0() + TimeDelta::try_seconds(2 * DAY).unwrap();

        assert_eq!(schedule.catch_up(now), 3);
        assert_eq!(schedule.next(), t0() + TimeDelta::try_seconds(3 * DAY).unwrap());
        assert_eq!(schedule.catch_up(now), 0);
    }
}
