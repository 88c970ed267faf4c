//! Total budget: the invariant-bearing heart of the ledger
//!
//! Tracks the total cap, the running total, per-category budgets and the
//! recurrence schedule. Every operation either applies fully or is
//! rejected before any field changes. The sum of category caps never
//! exceeds the total cap through category operations; lowering the
//! total cap itself is allowed even if it breaks that bound.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{CategoryBudget, LedgerEntry, Money, Recurrence};

/// Default total budget cap for a fresh ledger
pub const DEFAULT_TOTAL_CAP: Money = Money::from_cents(2800);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalBudget {
    cap: Money,
    spent: Money,
    recurrence: Option<Recurrence>,
    categories: BTreeMap<String, CategoryBudget>,
}

impl Default for TotalBudget {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_CAP)
    }
}

impl TotalBudget {
    /// Create a budget with nothing spent and no category budgets
    pub fn new(cap: Money) -> Self {
        Self {
            cap,
            spent: Money::zero(),
            recurrence: None,
            categories: BTreeMap::new(),
        }
    }

    /// Rebuild a budget from persisted parts
    ///
    /// Category caps are not checked against the total, since a persisted
    /// ledger may legitimately have had its total cap lowered.
    pub fn restore(
        cap: Money,
        spent: Money,
        recurrence: Option<Recurrence>,
        categories: impl IntoIterator<Item = CategoryBudget>,
    ) -> LedgerResult<Self> {
        let mut budget = Self {
            cap,
            spent,
            recurrence,
            categories: BTreeMap::new(),
        };
        for category in categories {
            budget.restore_category_budget(category)?;
        }
        Ok(budget)
    }

    /// Insert a persisted category budget as-is, keeping its running total
    pub fn restore_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        if self.categories.contains_key(budget.category()) {
            return Err(LedgerError::DuplicateCategory(budget.category().to_string()));
        }
        self.categories.insert(budget.category().to_string(), budget);
        Ok(())
    }

    pub fn cap(&self) -> Money {
        self.cap
    }

    /// Running total since the last reset
    pub fn spent(&self) -> Money {
        self.spent
    }

    /// What is left before the cap is reached
    pub fn remaining(&self) -> Money {
        self.cap.saturating_sub(self.spent)
    }

    pub fn is_within_cap(&self) -> bool {
        self.spent <= self.cap
    }

    pub fn recurrence(&self) -> Option<&Recurrence> {
        self.recurrence.as_ref()
    }

    /// Category budgets ordered by category label
    pub fn category_budgets(&self) -> impl Iterator<Item = &CategoryBudget> {
        self.categories.values()
    }

    pub fn category_budget(&self, category: &str) -> Option<&CategoryBudget> {
        self.categories.get(category)
    }

    /// Sum of all category caps
    pub fn category_caps_total(&self) -> Money {
        self.categories.values().map(CategoryBudget::cap).sum()
    }

    /// Add a cost to the running total
    ///
    /// Returns whether the new total is still within the cap. Going over
    /// the cap is reported, not rejected.
    pub fn add_expense(&mut self, cost: Money) -> bool {
        self.spent += cost;
        self.is_within_cap()
    }

    /// Add an entry's cost to the total and to its category budget, if any
    pub fn record_entry(&mut self, entry: &LedgerEntry) -> bool {
        if let Some(category) = self.categories.get_mut(entry.category()) {
            category.record(entry.cost());
        }
        self.add_expense(entry.cost())
    }

    /// Take an entry's cost off the total and its category budget, if any
    pub fn remove_expense(&mut self, entry: &LedgerEntry) {
        self.spent = self.spent.saturating_sub(entry.cost());
        if let Some(category) = self.categories.get_mut(entry.category()) {
            category.unrecord(entry.cost());
        }
    }

    /// Move spending attribution from `old` to `new` in one step
    ///
    /// Returns whether the total is within the cap afterwards.
    pub fn alter_spending(&mut self, old: &LedgerEntry, new: &LedgerEntry) -> bool {
        self.remove_expense(old);
        self.record_entry(new)
    }

    /// Insert a new category budget
    pub fn add_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        if self.categories.contains_key(budget.category()) {
            return Err(LedgerError::DuplicateCategory(budget.category().to_string()));
        }
        self.ensure_fits(&budget, Money::zero())?;

        debug!(category = budget.category(), cap = %budget.cap(), "adding category budget");
        self.categories.insert(budget.category().to_string(), budget);
        Ok(())
    }

    /// Change the cap of an existing category budget
    ///
    /// The category's running total is kept; only the cap is taken from `budget`.
    pub fn modify_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        let existing = self
            .categories
            .get(budget.category())
            .ok_or_else(|| LedgerError::CategoryBudgetNotFound(budget.category().to_string()))?;
        let spent = existing.spent();
        self.ensure_fits(&budget, existing.cap())?;

        debug!(category = budget.category(), cap = %budget.cap(), "modifying category budget");
        let budget = budget.with_spent(spent);
        self.categories.insert(budget.category().to_string(), budget);
        Ok(())
    }

    /// Reject `budget` if the category caps would exceed the total cap
    ///
    /// `replaced_cap` is the cap `budget` takes the place of, if any.
    fn ensure_fits(&self, budget: &CategoryBudget, replaced_cap: Money) -> LedgerResult<()> {
        let others = self.category_caps_total().saturating_sub(replaced_cap);
        if others + budget.cap() > self.cap {
            return Err(LedgerError::CategoryBudgetExceedsTotal {
                category: budget.category().to_string(),
                requested: budget.cap(),
                available: self.cap.saturating_sub(others),
            });
        }
        Ok(())
    }

    /// Replace the total cap, keeping the running total
    ///
    /// Existing category caps are left as they are even if they now sum
    /// to more than the new cap.
    pub fn modify_total_cap(&mut self, cap: Money) {
        debug!(old = %self.cap, new = %cap, "modifying total budget cap");
        self.cap = cap;
    }

    /// Reset running totals every `interval_secs`, starting one interval after `now`
    pub fn set_recurrence(&mut self, interval_secs: i64, now: DateTime<Utc>) -> LedgerResult<()> {
        let recurrence = Recurrence::starting_at(now, interval_secs)?;
        debug!(interval_secs, next = %recurrence.next(), "setting budget recurrence");
        self.recurrence = Some(recurrence);
        Ok(())
    }

    /// Stop resetting running totals
    pub fn clear_recurrence(&mut self) {
        self.recurrence = None;
    }

    /// Reset the total and every category running total to zero
    pub fn clear_spending(&mut self) {
        self.spent = Money::zero();
        for category in self.categories.values_mut() {
            category.clear_spending();
        }
    }

    /// Apply any reset that has come due by `now`
    ///
    /// Spending is cleared once no matter how many periods were missed,
    /// and the next reset moves past `now`. Returns whether a reset happened.
    pub fn check_and_apply_recurrence(&mut self, now: DateTime<Utc>) -> bool {
        let Some(recurrence) = self.recurrence.as_mut() else {
            return false;
        };

        let periods = recurrence.catch_up(now);
        if periods == 0 {
            return false;
        }

        let next = recurrence.next();
        self.clear_spending();
        info!(periods, %next, "budget period elapsed, spending reset");
        true
    }
}
