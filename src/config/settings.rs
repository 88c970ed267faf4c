//! User settings for the budget ledger
//!
//! Defaults for new ledgers, the backup policy, and the key derivation
//! parameters shared by every ledger under one base directory.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::paths::LedgerPaths;
use crate::crypto::key_derivation::KeyDerivationParams;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::DEFAULT_TOTAL_CAP;
use crate::models::Money;
use crate::storage::file_io::{read_json, write_json_atomic};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Total cap given to a newly created ledger
    #[serde(default = "default_total_budget")]
    pub default_total_budget: Money,

    /// Reset interval given to a newly created ledger, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_seconds: Option<i64>,

    /// Whether every save also writes the backup file
    #[serde(default = "default_backup_on_save")]
    pub backup_on_save: bool,

    /// Key derivation parameters (salt, memory cost, etc.)
    #[serde(default)]
    pub key_derivation: KeyDerivationParams,
}

fn default_schema_version() -> u32 {
    1
}

fn default_total_budget() -> Money {
    DEFAULT_TOTAL_CAP
}

fn default_backup_on_save() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_total_budget: default_total_budget(),
            recurrence_seconds: None,
            backup_on_save: default_backup_on_save(),
            key_derivation: KeyDerivationParams::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or build defaults if the file doesn't exist
    ///
    /// A missing key derivation salt is generated here. Nothing is written;
    /// the caller decides when to persist.
    pub fn load_or_create(paths: &LedgerPaths) -> LedgerResult<Self> {
        let settings_path = paths.settings_file();

        let mut settings = read_json::<Settings, _>(&settings_path)
            .map_err(|e| LedgerError::Config(format!("failed to load settings: {}", e)))?
            .unwrap_or_default();

        if !settings.key_derivation.has_salt() {
            debug!("generating key derivation salt");
            settings.key_derivation.salt = KeyDerivationParams::new().salt;
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> LedgerResult<()> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_total_budget, Money::from_cents(2800));
        assert_eq!(settings.recurrence_seconds, None);
        assert!(settings.backup_on_save);
    }

    #[test]
    fn test_load_or_create_generates_salt() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        let settings = Settings::load_or_create(&paths).unwrap();
        assert!(settings.key_derivation.has_salt());
        assert!(!paths.settings_file().exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::load_or_create(&paths).unwrap();
        settings.recurrence_seconds = Some(604_800);
        settings.backup_on_save = false;
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.schema_version, 1);
        assert_eq!(settings.default_total_budget, DEFAULT_TOTAL_CAP);
        assert!(settings.backup_on_save);
    }

    #[test]
    fn test_unparseable_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), "{ nope").unwrap();

        assert!(matches!(
            Settings::load_or_create(&paths),
            Err(LedgerError::Config(_))
        ));
    }
}
