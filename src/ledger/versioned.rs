//! Undo/redo history over a ledger state
//!
//! Mutations change a working copy. `commit` stores an independent copy
//! of the working state after the current position (dropping any redo
//! branch); `undo` and `redo` move along the stored states and restore a
//! copy of the one they land on. Stored states are never mutated.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::budget::TotalBudget;
use super::state::LedgerState;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CategoryBudget, EntryEdit, EntryFilter, LedgerEntry, Money};

/// Deep copy of the ledger handed to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub entries: Vec<LedgerEntry>,
    pub budget: TotalBudget,
}

#[derive(Debug, Clone)]
pub struct VersionedLedger {
    working: LedgerState,
    history: Vec<LedgerState>,
    pointer: usize,
}

impl VersionedLedger {
    /// Start a history containing only `initial`
    pub fn new(initial: LedgerState) -> Self {
        Self {
            history: vec![initial.clone()],
            working: initial,
            pointer: 0,
        }
    }

    /// The live working state
    pub fn state(&self) -> &LedgerState {
        &self.working
    }

    /// The stored state the history pointer is on
    pub fn committed(&self) -> &LedgerState {
        &self.history[self.pointer]
    }

    /// Deep copy of the working entries and budget
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            entries: self.working.entries().as_slice().to_vec(),
            budget: self.working.budget().clone(),
        }
    }

    /// Number of stored states
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Check whether the working state differs from the current stored state
    pub fn has_uncommitted_changes(&self) -> bool {
        &self.working != self.committed()
    }

    /// Store the working state as the newest history entry
    pub fn commit(&mut self) {
        self.history.truncate(self.pointer + 1);
        self.history.push(self.working.clone());
        self.pointer = self.history.len() - 1;
        debug!(position = self.pointer, "ledger state committed");
    }

    /// Throw away uncommitted working changes
    pub fn discard(&mut self) {
        self.working = self.committed().clone();
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.history.len()
    }

    /// Restore the previous stored state
    pub fn undo(&mut self) -> LedgerResult<()> {
        if !self.can_undo() {
            return Err(LedgerError::NoUndoableState);
        }
        self.pointer -= 1;
        self.working = self.history[self.pointer].clone();
        debug!(position = self.pointer, "undo");
        Ok(())
    }

    /// Restore the next stored state
    pub fn redo(&mut self) -> LedgerResult<()> {
        if !self.can_redo() {
            return Err(LedgerError::NoRedoableState);
        }
        self.pointer += 1;
        self.working = self.history[self.pointer].clone();
        debug!(position = self.pointer, "redo");
        Ok(())
    }

    // === Working-state mutations ===

    pub fn add_entry(&mut self, entry: LedgerEntry) -> LedgerResult<bool> {
        self.working.add_entry(entry)
    }

    pub fn update_entry(&mut self, target: &LedgerEntry, edited: LedgerEntry) -> LedgerResult<bool> {
        self.working.update_entry(target, edited)
    }

    pub fn delete_entry(&mut self, target: &LedgerEntry) -> LedgerResult<()> {
        self.working.delete_entry(target)
    }

    pub fn set_entries(&mut self, entries: Vec<LedgerEntry>) -> LedgerResult<()> {
        self.working.set_entries(entries)
    }

    pub fn mass_edit(&mut self, filter: &EntryFilter, edit: &EntryEdit) -> LedgerResult<usize> {
        self.working.mass_edit(filter, edit)
    }

    pub fn add_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        self.working.add_category_budget(budget)
    }

    pub fn modify_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        self.working.modify_category_budget(budget)
    }

    pub fn modify_total_cap(&mut self, cap: Money) {
        self.working.modify_total_cap(cap);
    }

    pub fn set_recurrence(&mut self, interval_secs: i64, now: DateTime<Utc>) -> LedgerResult<()> {
        self.working.set_recurrence(interval_secs, now)
    }

    pub fn check_and_apply_recurrence(&mut self, now: DateTime<Utc>) -> bool {
        self.working.check_and_apply_recurrence(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn entry(name: &str) -> LedgerEntry {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        LedgerEntry::new(name, "Food", Money::from_cents(500), date).unwrap()
    }

    fn fresh() -> VersionedLedger {
        VersionedLedger::new(LedgerState::new(Money::from_cents(2800)))
    }

    #[test]
    fn test_initial_state() {
        let ledger = fresh();
        assert!(!ledger.can_undo());
        assert!(!ledger.can_redo());
        assert_eq!(ledger.history_len(), 1);
    }

    #[test]
    fn test_boundaries() {
        let mut ledger = fresh();
        assert_eq!(ledger.undo(), Err(LedgerError::NoUndoableState));
        assert_eq!(ledger.redo(), Err(LedgerError::NoRedoableState));
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut ledger = fresh();
        let s0 = ledger.state().clone();

        ledger.add_entry(entry("Lunch")).unwrap();
        ledger.commit();
        let s1 = ledger.state().clone();

        ledger.undo().unwrap();
        assert_eq!(ledger.state(), &s0);
        assert!(ledger.can_redo());

        ledger.redo().unwrap();
        assert_eq!(ledger.state(), &s1);
        assert!(!ledger.can_redo());
    }

    #[test]
    fn test_commit_truncates_redo_branch() {
        let mut ledger = fresh();
        ledger.add_entry(entry("a")).unwrap();
        ledger.commit();
        ledger.add_entry(entry("b")).unwrap();
        ledger.commit();

        ledger.undo().unwrap();
        ledger.add_entry(entry("c")).unwrap();
        ledger.commit();

        assert_eq!(ledger.history_len(), 3);
        assert!(!ledger.can_redo());
        let names: Vec<_> = ledger.state().entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_history_not_aliased_by_working_mutations() {
        let mut ledger = fresh();
        ledger.add_entry(entry("a")).unwrap();
        ledger.commit();
        let committed = ledger.state().clone();

        ledger.add_entry(entry("b")).unwrap();
        assert!(ledger.has_uncommitted_changes());
        ledger.discard();
        assert_eq!(ledger.state(), &committed);
    }

    #[test]
    fn test_uncommitted_work_is_lost_on_undo() {
        let mut ledger = fresh();
        let s0 = ledger.state().clone();
        ledger.add_entry(entry("a")).unwrap();
        ledger.commit();

        ledger.add_entry(entry("b")).unwrap();
        ledger.undo().unwrap();
        assert_eq!(ledger.state(), &s0);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut ledger = fresh();
        ledger.add_entry(entry("a")).unwrap();
        let snapshot = ledger.snapshot();

        ledger.add_entry(entry("b")).unwrap();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.budget.spent(), Money::from_cents(500));
    }

    #[derive(Debug, Clone)]
    enum Step {
        AddCommit(u8),
        Undo,
        Redo,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0u8..50).prop_map(Step::AddCommit),
            Just(Step::Undo),
            Just(Step::Redo),
        ]
    }

    proptest! {
        #[test]
        fn prop_history_follows_reference_model(steps in proptest::collection::vec(step(), 0..40)) {
            let mut ledger = fresh();
            let mut model = vec![ledger.state().clone()];
            let mut position = 0usize;

            for step in steps {
                match step {
                    Step::AddCommit(n) => {
                        let _ = ledger.add_entry(entry(&format!("e{n}")));
                        ledger.commit();
                        model.truncate(position + 1);
                        model.push(ledger.state().clone());
                        position = model.len() - 1;
                    }
                    Step::Undo => {
                        prop_assert_eq!(ledger.undo().is_ok(), position > 0);
                        position = position.saturating_sub(1);
                    }
                    Step::Redo => {
                        prop_assert_eq!(ledger.redo().is_ok(), position + 1 < model.len());
                        position = (position + 1).min(model.len() - 1);
                    }
                }
                prop_assert_eq!(ledger.state(), &model[position]);
            }
        }
    }
}
