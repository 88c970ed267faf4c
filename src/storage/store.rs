//! Persistence stores for encrypted ledgers
//!
//! A store only moves [`EncryptedLedgerState`] values around, keyed by
//! username. It never sees plaintext.

use std::collections::HashMap;

use tracing::debug;

use super::codec::EncryptedLedgerState;
use super::file_io::{read_json, write_json_atomic};
use crate::config::paths::{validate_username, LedgerPaths};
use crate::error::{LedgerError, LedgerResult};

/// Backing store for encrypted ledgers
pub trait LedgerStore {
    /// Read a user's ledger, `None` if there is none yet
    fn read(&self, username: &str) -> LedgerResult<Option<EncryptedLedgerState>>;

    /// Overwrite a user's ledger
    fn write(&mut self, username: &str, state: &EncryptedLedgerState) -> LedgerResult<()>;

    /// Overwrite a user's backup copy
    fn backup(&mut self, username: &str, state: &EncryptedLedgerState) -> LedgerResult<()>;
}

/// One pretty-printed JSON file per user under the data directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    paths: LedgerPaths,
}

impl JsonFileStore {
    pub fn new(paths: LedgerPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// Read a user's backup copy, `None` if there is none
    pub fn read_backup(&self, username: &str) -> LedgerResult<Option<EncryptedLedgerState>> {
        read_json(self.paths.backup_file(username)?)
    }
}

impl LedgerStore for JsonFileStore {
    fn read(&self, username: &str) -> LedgerResult<Option<EncryptedLedgerState>> {
        let path = self.paths.ledger_file(username)?;
        let state = read_json(&path)?;
        debug!(path = %path.display(), found = state.is_some(), "ledger file read");
        Ok(state)
    }

    fn write(&mut self, username: &str, state: &EncryptedLedgerState) -> LedgerResult<()> {
        let path = self.paths.ledger_file(username)?;
        write_json_atomic(&path, state)?;
        debug!(path = %path.display(), "ledger file written");
        Ok(())
    }

    fn backup(&mut self, username: &str, state: &EncryptedLedgerState) -> LedgerResult<()> {
        let path = self.paths.backup_file(username)?;
        write_json_atomic(&path, state)?;
        debug!(path = %path.display(), "ledger backup written");
        Ok(())
    }
}

/// In-memory store
///
/// Writes can be made to fail on demand to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ledgers: HashMap<String, EncryptedLedgerState>,
    backups: HashMap<String, EncryptedLedgerState>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write and backup fail with a storage error
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn backup_of(&self, username: &str) -> Option<&EncryptedLedgerState> {
        self.backups.get(username)
    }

    fn check_writable(&self, username: &str) -> LedgerResult<()> {
        validate_username(username)?;
        if self.fail_writes {
            return Err(LedgerError::Storage(format!(
                "write rejected for '{}'",
                username
            )));
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn read(&self, username: &str) -> LedgerResult<Option<EncryptedLedgerState>> {
        validate_username(username)?;
        Ok(self.ledgers.get(username).cloned())
    }

    fn write(&mut self, username: &str, state: &EncryptedLedgerState) -> LedgerResult<()> {
        self.check_writable(username)?;
        self.ledgers.insert(username.to_string(), state.clone());
        Ok(())
    }

    fn backup(&mut self, username: &str, state: &EncryptedLedgerState) -> LedgerResult<()> {
        self.check_writable(username)?;
        self.backups.insert(username.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::FieldKey;
    use crate::ledger::LedgerState;
    use crate::models::Money;
    use crate::storage::codec::to_encrypted;
    use tempfile::TempDir;

    fn encoded(cap_cents: u64) -> EncryptedLedgerState {
        let key = FieldKey::from_bytes(b"0123456789abcdef");
        to_encrypted(&LedgerState::new(Money::from_cents(cap_cents)), &key).unwrap()
    }

    #[test]
    fn test_json_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(LedgerPaths::with_base_dir(temp_dir.path().to_path_buf()));

        assert_eq!(store.read("alice").unwrap(), None);

        let state = encoded(2800);
        store.write("alice", &state).unwrap();
        assert_eq!(store.read("alice").unwrap(), Some(state));
        assert_eq!(store.read("bob").unwrap(), None);
    }

    #[test]
    fn test_json_store_backup_is_separate() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut store = JsonFileStore::new(paths.clone());

        store.write("alice", &encoded(2800)).unwrap();
        store.backup("alice", &encoded(1000)).unwrap();

        assert!(paths.backup_file("alice").unwrap().exists());
        assert_eq!(store.read_backup("alice").unwrap(), Some(encoded(1000)));
        assert_eq!(store.read("alice").unwrap(), Some(encoded(2800)));
    }

    #[test]
    fn test_json_store_rejects_unsafe_username() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(LedgerPaths::with_base_dir(temp_dir.path().to_path_buf()));

        assert!(matches!(
            store.write("../escape", &encoded(2800)),
            Err(LedgerError::InvalidFormat { .. })
        ));
        assert!(!temp_dir.path().join("escape.json").exists());
    }

    #[test]
    fn test_memory_store_failure_mode() {
        let mut store = MemoryStore::new();
        store.write("alice", &encoded(2800)).unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            store.write("alice", &encoded(1000)),
            Err(LedgerError::Storage(_))
        ));
        assert!(store.backup("alice", &encoded(1000)).is_err());
        assert_eq!(store.read("alice").unwrap(), Some(encoded(2800)));
        assert!(store.backup_of("alice").is_none());
    }
}
