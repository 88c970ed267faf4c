//! Storage layer
//!
//! The codec turns a ledger state into its encrypted, serializable form
//! and back. Stores persist that form per user, with atomic JSON writes
//! for the file-backed store.

pub mod codec;
pub mod file_io;
pub mod store;

pub use codec::{
    to_encrypted, to_plain, CorruptRecordReport, DecodedLedger, EncryptedCategoryBudget,
    EncryptedLedgerEntry, EncryptedLedgerState, RecordKind,
};
pub use file_io::{read_json, write_json_atomic};
pub use store::{JsonFileStore, LedgerStore, MemoryStore};
