//! Field keys and where they come from
//!
//! The ledger never generates or stores keys. A [`KeyProvider`] hands out
//! a [`FieldKey`] whenever the codec needs one.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::key_derivation::{derive_key, KeyDerivationParams};
use super::secure_memory::SecureString;
use crate::error::LedgerResult;

/// Raw key bytes for the field cipher, wiped on drop
///
/// Any length can be held; the cipher rejects lengths it does not support.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FieldKey {
    bytes: Vec<u8>,
}

impl FieldKey {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldKey")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Supplies the key used to encrypt and decrypt a ledger
pub trait KeyProvider {
    fn field_key(&self) -> LedgerResult<FieldKey>;
}

/// Derives the key from a passphrase with Argon2id on every request
#[derive(Debug, Clone)]
pub struct PassphraseKeyProvider {
    passphrase: SecureString,
    params: KeyDerivationParams,
}

impl PassphraseKeyProvider {
    pub fn new(passphrase: impl Into<SecureString>, params: KeyDerivationParams) -> Self {
        Self {
            passphrase: passphrase.into(),
            params,
        }
    }
}

impl KeyProvider for PassphraseKeyProvider {
    fn field_key(&self) -> LedgerResult<FieldKey> {
        derive_key(self.passphrase.as_str(), &self.params)
    }
}

/// Hands out a fixed key
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    key: FieldKey,
}

impl StaticKeyProvider {
    pub fn new(key: FieldKey) -> Self {
        Self { key }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(FieldKey::from_bytes(bytes))
    }
}

impl KeyProvider for StaticKeyProvider {
    fn field_key(&self) -> LedgerResult<FieldKey> {
        Ok(self.key.clone())
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for Box<P> {
    fn field_key(&self) -> LedgerResult<FieldKey> {
        (**self).field_key()
    }
}
