//! Core data models for the budget ledger
//!
//! Plain value types: money, ledger entries with their filters and edits,
//! category budgets and recurrence schedules.

pub mod budget;
pub mod entry;
pub mod money;

pub use budget::{CategoryBudget, Recurrence};
pub use entry::{EntryEdit, EntryFilter, EntryIdentity, LedgerEntry};
pub use money::Money;
