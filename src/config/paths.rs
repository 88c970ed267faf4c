//! Path management for the budget ledger
//!
//! ## Path Resolution Order
//!
//! 1. `BUDGET_LEDGER_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/budget-ledger` or `~/.config/budget-ledger`
//! 3. Windows: `%APPDATA%\budget-ledger`

use std::path::{Path, PathBuf};

use crate::error::{LedgerError, LedgerResult};

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "BUDGET_LEDGER_DATA_DIR";

const APP_DIR_NAME: &str = "budget-ledger";

/// Manages all paths used by the ledger
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    base_dir: PathBuf,
}

impl LedgerPaths {
    /// Resolve the base directory from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if no home or config directory can be determined.
    pub fn new() -> LedgerResult<Self> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Use a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding one ledger file per user
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Path of `username`'s ledger file
    pub fn ledger_file(&self, username: &str) -> LedgerResult<PathBuf> {
        validate_username(username)?;
        Ok(self.data_dir().join(format!("{}.json", username)))
    }

    /// Path of `username`'s backup file (`<ledger file>.backup`)
    pub fn backup_file(&self, username: &str) -> LedgerResult<PathBuf> {
        validate_username(username)?;
        Ok(self.data_dir().join(format!("{}.json.backup", username)))
    }

    /// Ensure the base and data directories exist
    pub fn ensure_directories(&self) -> LedgerResult<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| LedgerError::Io(format!("failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| LedgerError::Io(format!("failed to create data directory: {}", e)))?;

        Ok(())
    }
}

/// Check that a username can safely be used as a file name
///
/// Allowed: ASCII alphanumerics, `_`, `-` and `.`, not starting with `.`,
/// at most 64 characters.
pub fn validate_username(username: &str) -> LedgerResult<()> {
    let valid = !username.is_empty()
        && username.len() <= 64
        && !username.starts_with('.')
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(LedgerError::invalid("username", username))
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> LedgerResult<PathBuf> {
    let config_base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => {
            let home = std::env::var("HOME").map_err(|_| {
                LedgerError::Config("could not determine HOME directory".into())
            })?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_base.join(APP_DIR_NAME))
}

#[cfg(windows)]
fn resolve_default_path() -> LedgerResult<PathBuf> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| LedgerError::Config("could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
}
