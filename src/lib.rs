//! Budget ledger - versioned, encrypted-at-rest expense tracking
//!
//! This library keeps one user's expense ledger: entries, a total budget
//! cap with per-category sub-caps, and a periodic reset of running totals.
//! Every change can be undone and redone, and the ledger is stored with
//! each entry field encrypted.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `error`: Custom error types
//! - `models`: Money, entries, category budgets, recurrence schedules
//! - `ledger`: Entry collection, budget invariants, undo/redo history
//! - `crypto`: Field cipher, key derivation, key providers
//! - `storage`: Encrypted persistence codec and ledger stores
//! - `services`: Session facade, clock
//! - `config`: Path resolution and user settings
//! - `logging`: Tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use budget_ledger::config::{LedgerPaths, Settings};
//! use budget_ledger::crypto::PassphraseKeyProvider;
//! use budget_ledger::services::{LedgerSession, SystemClock};
//! use budget_ledger::storage::JsonFileStore;
//!
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! settings.save(&paths)?;
//! let keys = PassphraseKeyProvider::new("passphrase", settings.key_derivation.clone());
//! let mut session = LedgerSession::open(
//!     "alice",
//!     JsonFileStore::new(paths),
//!     keys,
//!     Arc::new(SystemClock),
//!     &settings,
//! )?;
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{LedgerSnapshot, LedgerState, TotalBudget, VersionedLedger};
pub use models::{CategoryBudget, LedgerEntry, Money};
pub use services::LedgerSession;
