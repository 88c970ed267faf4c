//! Cryptographic support for the ledger
//!
//! Deterministic AES-GCM field encryption, Argon2id key derivation from
//! passphrases, and the key provider seam the storage codec pulls keys from.

pub mod field_cipher;
pub mod key_derivation;
pub mod key_provider;
pub mod secure_memory;

pub use field_cipher::{decrypt_field, encrypt_field};
pub use key_derivation::{derive_key, KeyDerivationParams};
pub use key_provider::{FieldKey, KeyProvider, PassphraseKeyProvider, StaticKeyProvider};
pub use secure_memory::SecureString;
