//! Key derivation using Argon2id
//!
//! Turns a user passphrase into a 32-byte field key. The salt and cost
//! parameters live in the settings file so the same passphrase always
//! yields the same key for a given installation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, Params,
};
use serde::{Deserialize, Serialize};

use super::key_provider::FieldKey;
use crate::error::{LedgerError, LedgerResult};

/// Length of derived keys (AES-256)
pub const DERIVED_KEY_LEN: usize = 32;

/// Parameters for key derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDerivationParams {
    /// Salt for key derivation (base64 encoded)
    pub salt: String,
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism degree (default: 4)
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            salt: String::new(),
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KeyDerivationParams {
    /// Create new params with a random salt
    pub fn new() -> Self {
        let salt = SaltString::generate(&mut OsRng);
        Self {
            salt: salt.to_string(),
            ..Default::default()
        }
    }

    /// Create params with specific values
    pub fn with_values(salt: String, memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            salt,
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Whether a salt has been generated yet
    pub fn has_salt(&self) -> bool {
        !self.salt.is_empty()
    }
}

/// Derive a field key from a passphrase
pub fn derive_key(passphrase: &str, params: &KeyDerivationParams) -> LedgerResult<FieldKey> {
    let salt = SaltString::from_b64(&params.salt)
        .map_err(|e| LedgerError::Config(format!("invalid key derivation salt: {}", e)))?;

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(DERIVED_KEY_LEN),
    )
    .map_err(|e| LedgerError::Config(format!("invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| LedgerError::Config(format!("key derivation failed: {}", e)))?;

    let output = hash
        .hash
        .ok_or_else(|| LedgerError::Config("no hash output generated".to_string()))?;

    let bytes = output.as_bytes();
    if bytes.len() < DERIVED_KEY_LEN {
        return Err(LedgerError::Config(
            "hash output too short for a 32-byte key".to_string(),
        ));
    }

    Ok(FieldKey::from_bytes(&bytes[..DERIVED_KEY_LEN]))
}
