//! Error types for the budget ledger
//!
//! One error hierarchy covers the whole crate: input validation, collection
//! and budget invariants, history boundaries, the encryption boundary, and
//! the persistence store.

use thiserror::Error;

use crate::models::Money;

/// The main error type for ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed money, date, name, category, tag or username text
    #[error("Invalid {field}: '{value}'")]
    InvalidFormat { field: &'static str, value: String },

    /// An entry with the same identity is already present
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// The targeted entry is not in the collection
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Setting the category cap would push the sum of category caps over the total cap
    #[error(
        "Category budget for '{category}' of {requested} exceeds the {available} left in the total budget"
    )]
    CategoryBudgetExceedsTotal {
        category: String,
        requested: Money,
        available: Money,
    },

    /// The category already has a budget
    #[error("Category budget already exists: {0}")]
    DuplicateCategory(String),

    /// The category has no budget to modify
    #[error("Category budget not found: {0}")]
    CategoryBudgetNotFound(String),

    /// History pointer is already at the oldest state
    #[error("No more commands to undo")]
    NoUndoableState,

    /// History pointer is already at the newest state
    #[error("No more commands to redo")]
    NoRedoableState,

    /// A field could not be decrypted (bad key, bad encoding, tampered data)
    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    /// A persisted record could not be restored
    #[error("Corrupt record {record}: {reason}")]
    CorruptRecord { record: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Persistence store errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Create an "invalid format" error for a named field
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field,
            value: value.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntryNotFound(_) | Self::CategoryBudgetNotFound(_)
        )
    }

    /// Check if this error was raised by a collection or budget invariant check
    ///
    /// These are always raised before any state is touched.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEntry(_)
                | Self::EntryNotFound(_)
                | Self::CategoryBudgetExceedsTotal { .. }
                | Self::DuplicateCategory(_)
                | Self::CategoryBudgetNotFound(_)
        )
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
