//! Ledger session
//!
//! The single in-process owner of one user's ledger. It loads and saves
//! through a [`LedgerStore`], pulls keys from a [`KeyProvider`], checks the
//! recurrence against an injected [`Clock`] before every mutation, and
//! tells observers when the visible state changes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::clock::Clock;
use crate::config::Settings;
use crate::crypto::KeyProvider;
use crate::error::LedgerResult;
use crate::ledger::{LedgerSnapshot, LedgerState, VersionedLedger};
use crate::models::{CategoryBudget, EntryEdit, EntryFilter, LedgerEntry, Money};
use crate::storage::{to_encrypted, to_plain, CorruptRecordReport, LedgerStore};

/// Why observers are being notified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    Loaded,
    Committed,
    Undone,
    Redone,
}

impl fmt::Display for LedgerChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::Committed => write!(f, "committed"),
            Self::Undone => write!(f, "undone"),
            Self::Redone => write!(f, "redone"),
        }
    }
}

/// Receives a fresh copy of the ledger whenever its visible state changes
pub trait LedgerObserver: Send {
    fn ledger_changed(&mut self, change: LedgerChange, snapshot: &LedgerSnapshot);
}

pub struct LedgerSession<S: LedgerStore> {
    username: String,
    ledger: VersionedLedger,
    store: S,
    keys: Box<dyn KeyProvider + Send + Sync>,
    clock: Arc<dyn Clock>,
    observers: Vec<Box<dyn LedgerObserver>>,
    backup_on_save: bool,
    corrupt_records: Vec<CorruptRecordReport>,
}

impl<S: LedgerStore> LedgerSession<S> {
    /// Load `username`'s ledger, or start a fresh one from `settings`
    ///
    /// Records that fail to decode are skipped and reported through
    /// [`corrupt_records`](Self::corrupt_records). A wrong key fails the
    /// whole open. Overdue recurrence resets are applied before the
    /// initial history entry is taken.
    pub fn open(
        username: impl Into<String>,
        store: S,
        keys: impl KeyProvider + Send + Sync + 'static,
        clock: Arc<dyn Clock>,
        settings: &Settings,
    ) -> LedgerResult<Self> {
        let username = username.into();
        let keys: Box<dyn KeyProvider + Send + Sync> = Box::new(keys);

        let (state, corrupt_records) = load_state(&username, &store, keys.as_ref(), clock.as_ref(), settings)?;

        Ok(Self {
            username,
            ledger: VersionedLedger::new(state),
            store,
            keys,
            clock,
            observers: Vec::new(),
            backup_on_save: settings.backup_on_save,
            corrupt_records,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The live working state
    ///
    /// Running totals are as of the last recurrence check. Mutations,
    /// `commit` and `save` check first; call [`Self::check_recurrence`] to
    /// bring a read-only view up to date.
    pub fn state(&self) -> &LedgerState {
        self.ledger.state()
    }

    /// Copy of the working state, with running totals as of the last recurrence check
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Records skipped by the last load
    pub fn corrupt_records(&self) -> &[CorruptRecordReport] {
        &self.corrupt_records
    }

    pub fn can_undo(&self) -> bool {
        self.ledger.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.ledger.can_redo()
    }

    pub fn has_uncommitted_changes(&self) -> bool {
        self.ledger.has_uncommitted_changes()
    }

    /// Register an observer and send it the current state
    pub fn add_observer(&mut self, mut observer: Box<dyn LedgerObserver>) {
        observer.ledger_changed(LedgerChange::Loaded, &self.ledger.snapshot());
        self.observers.push(observer);
    }

    /// Apply any overdue recurrence reset to the working state
    ///
    /// Returns whether a reset happened. Called before every mutation and
    /// on commit.
    pub fn check_recurrence(&mut self) -> bool {
        let now = self.clock.now();
        self.ledger.check_and_apply_recurrence(now)
    }

    // === Mutations (working state; call `commit` to record them) ===

    pub fn add_entry(&mut self, entry: LedgerEntry) -> LedgerResult<bool> {
        self.check_recurrence();
        self.ledger.add_entry(entry)
    }

    pub fn update_entry(&mut self, target: &LedgerEntry, edited: LedgerEntry) -> LedgerResult<bool> {
        self.check_recurrence();
        self.ledger.update_entry(target, edited)
    }

    pub fn delete_entry(&mut self, target: &LedgerEntry) -> LedgerResult<()> {
        self.check_recurrence();
        self.ledger.delete_entry(target)
    }

    pub fn set_entries(&mut self, entries: Vec<LedgerEntry>) -> LedgerResult<()> {
        self.check_recurrence();
        self.ledger.set_entries(entries)
    }

    pub fn mass_edit(&mut self, filter: &EntryFilter, edit: &EntryEdit) -> LedgerResult<usize> {
        self.check_recurrence();
        self.ledger.mass_edit(filter, edit)
    }

    pub fn add_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        self.check_recurrence();
        self.ledger.add_category_budget(budget)
    }

    pub fn modify_category_budget(&mut self, budget: CategoryBudget) -> LedgerResult<()> {
        self.check_recurrence();
        self.ledger.modify_category_budget(budget)
    }

    pub fn modify_total_cap(&mut self, cap: Money) {
        self.check_recurrence();
        self.ledger.modify_total_cap(cap);
    }

    /// Start a recurrence whose first reset is one interval from now
    pub fn set_recurrence(&mut self, interval_secs: i64) -> LedgerResult<()> {
        self.check_recurrence();
        let now = self.clock.now();
        self.ledger.set_recurrence(interval_secs, now)
    }

    // === Queries ===

    pub fn find(&self, filter: &EntryFilter) -> Vec<LedgerEntry> {
        self.ledger.state().find(filter)
    }

    pub fn spending_by_category(&self) -> BTreeMap<String, Money> {
        self.ledger.state().spending_by_category()
    }

    // === History ===

    /// Record the working state in history and notify observers
    ///
    /// An overdue reset is applied first, so the recorded state is current.
    pub fn commit(&mut self) {
        self.check_recurrence();
        self.ledger.commit();
        self.notify(LedgerChange::Committed);
    }

    /// Drop uncommitted working changes
    pub fn discard(&mut self) {
        self.ledger.discard();
    }

    pub fn undo(&mut self) -> LedgerResult<()> {
        self.ledger.undo()?;
        self.notify(LedgerChange::Undone);
        Ok(())
    }

    pub fn redo(&mut self) -> LedgerResult<()> {
        self.ledger.redo()?;
        self.notify(LedgerChange::Redone);
        Ok(())
    }

    // === Persistence ===

    /// Encrypt the committed state and write it (and the backup) to the store
    ///
    /// An overdue reset is applied to the written copy only; history is
    /// left alone. On failure the in-memory ledger is untouched and still
    /// usable.
    pub fn save(&mut self) -> LedgerResult<()> {
        let key = self.keys.field_key()?;
        let mut committed = self.ledger.committed().clone();
        if committed.check_and_apply_recurrence(self.clock.now()) {
            debug!(user = %self.username, "saving with overdue reset applied");
        }
        let encoded = to_encrypted(&committed, &key)?;

        self.store.write(&self.username, &encoded)?;
        if self.backup_on_save {
            self.store.backup(&self.username, &encoded)?;
        }

        info!(
            user = %self.username,
            entries = encoded.entries.len(),
            backup = self.backup_on_save,
            "ledger saved"
        );
        Ok(())
    }

    /// Throw away in-memory history and load the stored ledger again
    pub fn reload(&mut self, settings: &Settings) -> LedgerResult<()> {
        let (state, corrupt_records) = load_state(
            &self.username,
            &self.store,
            self.keys.as_ref(),
            self.clock.as_ref(),
            settings,
        )?;
        self.ledger = VersionedLedger::new(state);
        self.corrupt_records = corrupt_records;
        self.notify(LedgerChange::Loaded);
        Ok(())
    }

    fn notify(&mut self, change: LedgerChange) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.ledger.snapshot();
        for observer in &mut self.observers {
            observer.ledger_changed(change, &snapshot);
        }
        debug!(%change, observers = self.observers.len(), "observers notified");
    }
}

fn load_state<S: LedgerStore>(
    username: &str,
    store: &S,
    keys: &(dyn KeyProvider + Send + Sync),
    clock: &dyn Clock,
    settings: &Settings,
) -> LedgerResult<(LedgerState, Vec<CorruptRecordReport>)> {
    let now = clock.now();

    let (mut state, corrupt_records) = match store.read(username)? {
        Some(encoded) => {
            let key = keys.field_key()?;
            let decoded = to_plain(&encoded, &key)?;
            if !decoded.is_clean() {
                warn!(
                    user = %username,
                    corrupt = decoded.corrupt_records.len(),
                    "ledger loaded with corrupt records"
                );
            }
            (decoded.ledger, decoded.corrupt_records)
        }
        None => {
            debug!(user = %username, "no stored ledger, starting fresh");
            let mut state = LedgerState::new(settings.default_total_budget);
            if let Some(secs) = settings.recurrence_seconds {
                state.set_recurrence(secs, now)?;
            }
            (state, Vec::new())
        }
    };

    state.check_and_apply_recurrence(now);
    info!(user = %username, entries = state.entries().len(), "ledger opened");
    Ok((state, corrupt_records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::StaticKeyProvider;
    use crate::error::LedgerError;
    use crate::services::clock::FixedClock;
    use crate::storage::MemoryStore;
    use chrono::{TimeDelta, TimeZone, Utc};
    use std::sync::Mutex;

    const KEY: &[u8] = b"0123456789abcdef";

    fn m(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    fn entry(name: &str, category: &str, cost: &str) -> LedgerEntry {
        LedgerEntry::parse(name, category, cost, "15-01-2025", []).unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap())
    }

    fn open_with(store: MemoryStore, clock: &FixedClock, settings: &Settings) -> LedgerSession<MemoryStore> {
        LedgerSession::open(
            "alice",
            store,
            StaticKeyProvider::from_bytes(KEY),
            Arc::new(clock.clone()),
            settings,
        )
        .unwrap()
    }

    fn open(store: MemoryStore) -> LedgerSession<MemoryStore> {
        open_with(store, &clock(), &Settings::default())
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<(LedgerChange, usize)>>>,
    }

    impl LedgerObserver for Recorder {
        fn ledger_changed(&mut self, change: LedgerChange, snapshot: &LedgerSnapshot) {
            self.events.lock().unwrap().push((change, snapshot.entries.len()));
        }
    }

    #[test]
    fn test_fresh_ledger_uses_settings() {
        let session = open(MemoryStore::new());
        assert_eq!(session.state().budget().cap(), m("28.00"));
        assert!(session.state().entries().is_empty());
        assert!(session.corrupt_records().is_empty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_save_and_reopen() {
        let mut session = open(MemoryStore::new());
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.commit();
        session.save().unwrap();

        let store = session.store().clone();
        assert!(store.backup_of("alice").is_some());

        let reopened = open(store);
        assert_eq!(reopened.state(), session.state());
    }

    #[test]
    fn test_save_writes_committed_state_only() {
        let mut session = open(MemoryStore::new());
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.save().unwrap();

        let reopened = open(session.store().clone());
        assert!(reopened.state().entries().is_empty());
    }

    #[test]
    fn test_save_failure_keeps_memory() {
        let mut session = open(MemoryStore::new());
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.commit();

        session.store_mut().set_fail_writes(true);
        assert!(matches!(session.save(), Err(LedgerError::Storage(_))));

        assert_eq!(session.state().entries().len(), 1);
        session.store_mut().set_fail_writes(false);
        session.save().unwrap();
    }

    #[test]
    fn test_wrong_key_fails_open() {
        let mut session = open(MemoryStore::new());
        session.commit();
        session.save().unwrap();

        let result = LedgerSession::open(
            "alice",
            session.store().clone(),
            StaticKeyProvider::from_bytes(b"fedcba9876543210"),
            Arc::new(clock()),
            &Settings::default(),
        );
        assert!(matches!(result, Err(LedgerError::DecryptionFailure(_))));
    }

    #[test]
    fn test_corrupt_record_reported_on_open() {
        let mut session = open(MemoryStore::new());
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.add_entry(entry("Dinner", "Food", "9.00")).unwrap();
        session.commit();
        session.save().unwrap();

        let mut store = session.store().clone();
        let mut encoded = store.read("alice").unwrap().unwrap();
        encoded.entries[1].name = "AAAA".to_string();
        store.write("alice", &encoded).unwrap();

        let reopened = open(store);
        assert_eq!(reopened.corrupt_records().len(), 1);
        assert_eq!(reopened.corrupt_records()[0].index, 1);
        assert_eq!(reopened.state().entries().len(), 1);
    }

    #[test]
    fn test_observers_follow_history() {
        let recorder = Recorder::default();
        let mut session = open(MemoryStore::new());
        session.add_observer(Box::new(recorder.clone()));

        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.commit();
        session.undo().unwrap();
        session.redo().unwrap();
        assert!(session.undo().is_ok());
        assert_eq!(session.undo(), Err(LedgerError::NoUndoableState));

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                (LedgerChange::Loaded, 0),
                (LedgerChange::Committed, 1),
                (LedgerChange::Undone, 0),
                (LedgerChange::Redone, 1),
                (LedgerChange::Undone, 0),
            ]
        );
    }

    #[test]
    fn test_failed_mutation_changes_nothing() {
        let mut session = open(MemoryStore::new());
        session
            .add_category_budget(CategoryBudget::new("Food", m("20.00")).unwrap())
            .unwrap();
        session.commit();

        let before = session.state().clone();
        let result = session.add_category_budget(CategoryBudget::new("Fun", m("10.00")).unwrap());
        assert!(matches!(result, Err(LedgerError::CategoryBudgetExceedsTotal { .. })));
        assert_eq!(session.state(), &before);
        assert!(!session.has_uncommitted_changes());
    }

    #[test]
    fn test_recurrence_checked_before_mutation() {
        let clock = clock();
        let mut session = open_with(MemoryStore::new(), &clock, &Settings::default());
        session.set_recurrence(86_400).unwrap();
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.commit();
        assert_eq!(session.state().budget().spent(), m("5.00"));

        clock.advance(TimeDelta::days(3));
        session.add_entry(entry("Dinner", "Food", "7.00")).unwrap();

        assert_eq!(session.state().budget().spent(), m("7.00"));
        assert_eq!(session.state().entries().len(), 2);
    }

    #[test]
    fn test_commit_applies_overdue_reset() {
        let clock = clock();
        let mut session = open_with(MemoryStore::new(), &clock, &Settings::default());
        session.set_recurrence(86_400).unwrap();
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.commit();

        clock.advance(TimeDelta::days(2));
        assert_eq!(session.state().budget().spent(), m("5.00"));

        session.commit();
        assert_eq!(session.state().budget().spent(), Money::zero());
        assert!(session.state().is_carried_over(&entry("Lunch", "Food", "5.00")));
        assert!(!session.has_uncommitted_changes());
    }

    #[test]
    fn test_save_applies_overdue_reset() {
        let clock = clock();
        let mut session = open_with(MemoryStore::new(), &clock, &Settings::default());
        session.set_recurrence(86_400).unwrap();
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.commit();

        clock.advance(TimeDelta::days(2));
        session.save().unwrap();

        let stored = session.store().read("alice").unwrap().unwrap();
        assert_eq!(stored.total_spent, Money::zero());
        assert!(stored.recurrence.unwrap().next() > clock.now());
        assert!(stored.entries[0].carried_over);
        assert_eq!(session.state().budget().spent(), m("5.00"));
    }

    #[test]
    fn test_recurrence_caught_up_on_open() {
        let clock = clock();
        let settings = Settings {
            recurrence_seconds: Some(86_400),
            ..Settings::default()
        };
        let mut session = open_with(MemoryStore::new(), &clock, &settings);
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.commit();
        session.save().unwrap();

        clock.advance(TimeDelta::days(2));
        let reopened = open_with(session.store().clone(), &clock, &settings);

        let budget = reopened.state().budget();
        assert_eq!(budget.spent(), Money::zero());
        assert!(budget.recurrence().unwrap().next() > clock.now());
    }

    #[test]
    fn test_reload_discards_unsaved_history() {
        let recorder = Recorder::default();
        let mut session = open(MemoryStore::new());
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.commit();
        session.save().unwrap();

        session.add_entry(entry("Dinner", "Food", "9.00")).unwrap();
        session.commit();
        session.add_observer(Box::new(recorder.clone()));

        session.reload(&Settings::default()).unwrap();
        assert_eq!(session.state().entries().len(), 1);
        assert!(!session.can_undo());
        assert_eq!(
            recorder.events.lock().unwrap().last(),
            Some(&(LedgerChange::Loaded, 1))
        );
    }

    #[test]
    fn test_mass_edit_and_queries() {
        let mut session = open(MemoryStore::new());
        session.add_entry(entry("Lunch", "Food", "5.00")).unwrap();
        session.add_entry(entry("Coffee", "Food", "3.00")).unwrap();
        session.commit();

        let edit = EntryEdit::new().category("Meals").unwrap();
        let edited = session.mass_edit(&EntryFilter::new().category("food"), &edit).unwrap();
        assert_eq!(edited, 2);

        let totals = session.spending_by_category();
        assert_eq!(totals.get("Meals"), Some(&m("8.00")));
        assert_eq!(session.find(&EntryFilter::new().name_keywords(["cof"])).len(), 1);
    }
}
