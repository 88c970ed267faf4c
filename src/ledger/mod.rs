//! The versioned ledger engine
//!
//! - `entries`: ordered collection enforcing entry identity uniqueness
//! - `budget`: total and category caps, running totals, recurrence
//! - `state`: entries and budget kept consistent through composite operations
//! - `versioned`: linear undo/redo history of committed states

pub mod budget;
pub mod entries;
pub mod state;
pub mod versioned;

pub use budget::{TotalBudget, DEFAULT_TOTAL_CAP};
pub use entries::UniqueEntryCollection;
pub use state::LedgerState;
pub use versioned::{LedgerSnapshot, VersionedLedger};
