//! Ledger state: the entry collection together with its budget
//!
//! Composite operations keep both halves consistent: an entry is only
//! counted by the budget if the collection accepted it, and every
//! rejection happens before anything is changed.
//!
//! Entries present at the last recurrence reset are carried over. They
//! stay in the collection but no longer count toward any running total,
//! so deleting or editing them leaves the current period alone.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use super::budget::TotalBudget;
use super::entries::UniqueEntryCollection;
use crate::error::LedgerResult;
use crate::models::{CategoryBudget, EntryEdit, EntryFilter, LedgerEntry, Money};

/// Owned identity of an entry
type EntryKey = (String, String, Money, NaiveDate);

fn entry_key(entry: &LedgerEntry) -> EntryKey {
    (
        entry.name().to_string(),
        entry.category().to_string(),
        entry.cost(),
        entry.date(),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    entries: UniqueEntryCollection,
    budget: TotalBudget,
    carried_over: BTreeSet<EntryKey>,
}

impl LedgerState {
    /// Create an empty ledger with the given total cap
    pub fn new(cap: Money) -> Self {
        Self {
            entries: UniqueEntryCollection::new(),
            budget: TotalBudget::new(cap),
            carried_over: BTreeSet::new(),
        }
    }

    /// Assemble a ledger from already-consistent parts (used when loading)
    pub fn from_parts(entries: UniqueEntryCollection, budget: TotalBudget) -> Self {
        Self {
            entries,
            budget,
            carried_over: BTreeSet::new(),
        }
    }

    /// Mark entries as carried over from before the last reset
    ///
    /// Entries not in the collection are ignored.
    pub fn with_carried_over<'a>(mut self, carried: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        for entry in carried {
            if self.entries.contains(entry) {
                self.carried_over.insert(entry_key(entry));
            }
        }
        self
    }

    pub fn entries(&self) -> &UniqueEntryCollection {
        &self.entries
    }

    pub fn budget(&self) -> &TotalBudget {
        &self.budget
    }

    /// Check if an entry with the same identity is recorded
    pub fn has_entry(&self, entry: &LedgerEntry) -> bool {
        self.entries.contains(entry)
    }

    /// Check if `entry` was recorded before the last reset
    pub fn is_carried_over(&self, entry: &LedgerEntry) -> bool {
        self.carried_over.contains(&entry_key(entry))
    }

    /// Record a new entry
    ///
    /// Returns whether the total is still within the cap; over-cap entries
    /// are recorded all the same.
    pub fn add_entry(&mut self, entry: LedgerEntry) -> LedgerResult<bool> {
        self.entries.add(entry.clone())?;
        let within_cap = self.budget.record_entry(&entry);
        if within_cap {
            debug!(entry = %entry, "entry added");
        } else {
            warn!(entry = %entry, spent = %self.budget.spent(), cap = %self.budget.cap(), "total budget exceeded");
        }
        Ok(within_cap)
    }

    /// Replace `target` with `edited`, moving its spending attribution
    ///
    /// A carried-over entry stays carried over and no running total changes.
    pub fn update_entry(&mut self, target: &LedgerEntry, edited: LedgerEntry) -> LedgerResult<bool> {
        let old = self.entries.replace(target, edited.clone())?;
        debug!(old = %old, new = %edited, "entry updated");
        if self.carried_over.remove(&entry_key(&old)) {
            self.carried_over.insert(entry_key(&edited));
            return Ok(self.budget.is_within_cap());
        }
        Ok(self.budget.alter_spending(&old, &edited))
    }

    /// Remove the entry with `target`'s identity
    pub fn delete_entry(&mut self, target: &LedgerEntry) -> LedgerResult<()> {
        let removed = self.entries.remove(target)?;
        if !self.carried_over.remove(&entry_key(&removed)) {
            self.budget.remove_expense(&removed);
        }
        debug!(entry = %removed, "entry deleted");
        Ok(())
    }

    /// Replace every entry and recount spending from the new list
    pub fn set_entries(&mut self, entries: Vec<LedgerEntry>) -> LedgerResult<()> {
        self.entries.set_all(entries)?;
        self.carried_over.clear();
        self.budget.clear_spending();
        for entry in &self.entries {
            self.budget.record_entry(entry);
        }
        debug!(count = self.entries.len(), "entries replaced");
        Ok(())
    }

    /// Apply `edit` to every entry matching `filter`, all or nothing
    ///
    /// Returns the number of entries edited.
    pub fn mass_edit(&mut self, filter: &EntryFilter, edit: &EntryEdit) -> LedgerResult<usize> {
        let targets: Vec<LedgerEntry> = self
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        if targets.is_empty() || edit.is_empty() {
            return Ok(0);
        }

        let edited: Vec<LedgerEntry> = self
            .entries
            .iter()
            .map(|e| if filter.matches(e) { edit.apply(e) } else { e.clone() })
            .collect();
        self.entries.set_all(edited)?;

        let mut still_carried = Vec::new();
        for old in &targets {
            let new = edit.apply(old);
            if self.carried_over.remove(&entry_key(old)) {
                still_carried.push(entry_key(&new));
            } else {
                self.budget.alter_spending(old, &new);
            }
        }
        self.carried_over.extend(still_carried);
        debug!(count = targets.len(), "entries mass edited");
        Ok(targets.len())
    }

    /// Entries matching `filter`, in collection order
    pub fn find(&self, filter: &EntryFilter) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Sum of entry costs per category
    pub fn spending_by_category(&self) -> BTreeMap<String, Money> {
        let mut totals = BTreeMap::new();
        for entry in &self.entries {
            *totals
                .entry(entry.category().to_string())
                .or_insert_with(Money::zero) += entry.cost();
        }
        totals
    }

    /// Add a category budget, counting the current period's entries in it
    pub fn add_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        let spent = self
            .entries
            .iter()
            .filter(|e| e.category() == budget.category() && !self.is_carried_over(e))
            .map(LedgerEntry::cost)
            .sum();
        self.budget.add_category_budget(budget.with_spent(spent))
    }

    pub fn modify_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        self.budget.modify_category_budget(budget)
    }

    pub fn modify_total_cap(&mut self, cap: Money) {
        self.budget.modify_total_cap(cap);
    }

    pub fn set_recurrence(&mut self, interval_secs: i64, now: DateTime<Utc>) -> LedgerResult<()> {
        self.budget.set_recurrence(interval_secs, now)
    }

    /// Apply a due reset, carrying over every entry recorded so far
    pub fn check_and_apply_recurrence(&mut self, now: DateTime<Utc>) -> bool {
        if !self.budget.check_and_apply_recurrence(now) {
            return false;
        }
        self.carried_over = self.entries.iter().map(entry_key).collect();
        true
    }
}
