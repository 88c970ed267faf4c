//! Deterministic field encryption with AES-GCM
//!
//! Each ledger field is encrypted on its own. The nonce is derived from an
//! HMAC-SHA256 of the plaintext, so the same field under the same key
//! always yields the same ciphertext and fields can be compared without
//! decryption. Ciphertext text is `base64(nonce || ciphertext || tag)`.
//!
//! 16-byte keys select AES-128-GCM, 32-byte keys AES-256-GCM.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::key_provider::FieldKey;
use crate::error::{LedgerError, LedgerResult};

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Domain separation for the nonce MAC
const NONCE_LABEL: &[u8] = b"budget-ledger/field-nonce/v1\0";

type HmacSha256 = Hmac<Sha256>;

enum FieldCipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl FieldCipher {
    fn new(key: &FieldKey) -> Result<Self, String> {
        let bytes = key.as_bytes();
        match bytes.len() {
            16 => Aes128Gcm::new_from_slice(bytes)
                .map(Self::Aes128)
                .map_err(|e| e.to_string()),
            32 => Aes256Gcm::new_from_slice(bytes)
                .map(Self::Aes256)
                .map_err(|e| e.to_string()),
            n => Err(format!("invalid key length: {} bytes (expected 16 or 32)", n)),
        }
    }

    fn encrypt(&self, nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Self::Aes128(cipher) => cipher.encrypt(Nonce::from_slice(nonce), plaintext),
            Self::Aes256(cipher) => cipher.encrypt(Nonce::from_slice(nonce), plaintext),
        }
    }

    fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Self::Aes128(cipher) => cipher.decrypt(Nonce::from_slice(nonce), ciphertext),
            Self::Aes256(cipher) => cipher.decrypt(Nonce::from_slice(nonce), ciphertext),
        }
    }
}

/// Derive the synthetic nonce for `plaintext`
fn derive_nonce(key: &FieldKey, plaintext: &[u8]) -> Result<[u8; NONCE_SIZE], String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes()).map_err(|e| e.to_string())?;
    mac.update(NONCE_LABEL);
    mac.update(plaintext);
    let digest = mac.finalize().into_bytes();

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&digest[..NONCE_SIZE]);
    Ok(nonce)
}

/// Encrypt a single field
///
/// Fails only when the key has an unsupported length.
pub fn encrypt_field(plaintext: &str, key: &FieldKey) -> LedgerResult<String> {
    let invalid_key = |reason: String| LedgerError::invalid("encryption key", reason);

    let cipher = FieldCipher::new(key).map_err(invalid_key)?;
    let nonce = derive_nonce(key, plaintext.as_bytes()).map_err(invalid_key)?;

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| invalid_key(format!("encryption failed: {}", e)))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Decrypt a single field
///
/// Any problem (bad key length, bad encoding, truncated or tampered data,
/// wrong key) is a [`LedgerError::DecryptionFailure`]; garbage is never returned.
pub fn decrypt_field(ciphertext: &str, key: &FieldKey) -> LedgerResult<String> {
    let cipher = FieldCipher::new(key).map_err(LedgerError::DecryptionFailure)?;

    let raw = STANDARD
        .decode(ciphertext)
        .map_err(|e| LedgerError::DecryptionFailure(format!("invalid ciphertext encoding: {}", e)))?;
    if raw.len() < NONCE_SIZE + TAG_SIZE {
        return Err(LedgerError::DecryptionFailure(format!(
            "ciphertext too short: {} bytes",
            raw.len()
        )));
    }
    let (nonce, sealed) = raw.split_at(NONCE_SIZE);

    let plaintext = cipher.decrypt(nonce, sealed).map_err(|_| {
        LedgerError::DecryptionFailure("invalid key or corrupted data".to_string())
    })?;

    let expected = derive_nonce(key, &plaintext).map_err(LedgerError::DecryptionFailure)?;
    if expected.as_slice() != nonce {
        return Err(LedgerError::DecryptionFailure(
            "nonce does not match field contents".to_string(),
        ));
    }

    String::from_utf8(plaintext)
        .map_err(|e| LedgerError::DecryptionFailure(format!("invalid UTF-8 in decrypted data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key128() -> FieldKey {
        FieldKey::from_bytes(b"0123456789abcdef")
    }

    fn key256() -> FieldKey {
        FieldKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn test_round_trip_both_key_sizes() {
        for key in [key128(), key256()] {
            let encrypted = encrypt_field("Lunch with friends", &key).unwrap();
            assert_ne!(encrypted, "Lunch with friends");
            assert_eq!(decrypt_field(&encrypted, &key).unwrap(), "Lunch with friends");
        }
    }

    #[test]
    fn test_empty_and_unicode() {
        let key = key128();
        for text in ["", "Café ☕", "28.00"] {
            let encrypted = encrypt_field(text, &key).unwrap();
            assert_eq!(decrypt_field(&encrypted, &key).unwrap(), text);
        }
    }

    #[test]
    fn test_deterministic() {
        let key = key128();
        assert_eq!(
            encrypt_field("Food", &key).unwrap(),
            encrypt_field("Food", &key).unwrap()
        );
        assert_ne!(
            encrypt_field("Food", &key).unwrap(),
            encrypt_field("Fuel", &key).unwrap()
        );
    }

    #[test]
    fn test_invalid_key_length() {
        let short = FieldKey::from_bytes(b"short");
        assert!(matches!(
            encrypt_field("x", &short),
            Err(LedgerError::InvalidFormat { .. })
        ));

        let encrypted = encrypt_field("x", &key128()).unwrap();
        assert!(matches!(
            decrypt_field(&encrypted, &short),
            Err(LedgerError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = encrypt_field("secret", &key128()).unwrap();
        let other = FieldKey::from_bytes(b"fedcba9876543210");
        assert!(matches!(
            decrypt_field(&encrypted, &other),
            Err(LedgerError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = key128();
        let encrypted = encrypt_field("Hello, World!", &key).unwrap();

        let mut raw = STANDARD.decode(&encrypted).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = STANDARD.encode(&raw);

        assert!(decrypt_field(&tampered, &key).is_err());
    }

    #[test]
    fn test_malformed_input_fails() {
        let key = key128();
        for bad in ["not base64!!", "", "AAAA"] {
            assert!(matches!(
                decrypt_field(bad, &key),
                Err(LedgerError::DecryptionFailure(_))
            ));
        }
    }
}
