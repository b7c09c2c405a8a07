//! Per-collection symmetric keys.
//!
//! Embargoed content is sealed with ChaCha20-Poly1305. A sealed payload is
//! laid out as `nonce (12 bytes) || ciphertext+tag`, so a reader only needs
//! the collection's [`SecretKey`] to open it.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use crate::error::{CoreError, Result};

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// A 256-bit symmetric key protecting one collection's content.
///
/// `Debug` never prints the key material, only a short fingerprint.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; KEY_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Parse from a hex string (64 characters).
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Short, non-reversible identifier for logs.
    pub fn fingerprint(&self) -> String {
        let digest = blake3::derive_key("embargo-key-fingerprint-v1", &self.0);
        hex::encode(&digest[..8])
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::Seal(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CoreError::Seal(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a payload produced by [`SecretKey::seal`].
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(CoreError::Truncated(sealed.len()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::Open(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CoreError::Open(e.to_string()))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({})", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let key = SecretKey::generate();
        let plaintext = b"embargoed until 09:30";

        let sealed = key.seal(plaintext).unwrap();
        assert_ne!(&sealed[NONCE_LEN..], plaintext);

        let opened = key.open(&sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let key1 = SecretKey::generate();
        let key2 = SecretKey::generate();

        let sealed = key1.seal(b"secret").unwrap();
        assert!(key2.open(&sealed).is_err());
    }

    #[test]
    fn test_open_truncated() {
        let key = SecretKey::generate();
        assert!(matches!(key.open(&[0u8; 4]), Err(CoreError::Truncated(4))));
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = SecretKey::generate();
        let a = key.seal(b"same").unwrap();
        let b = key.seal(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_hides_material() {
        let key = SecretKey::from_bytes([0xab; KEY_LEN]);
        let debug = format!("{:?}", key);
        assert!(debug.starts_with("SecretKey("));
        assert!(!debug.contains("abababab"));
    }

    #[test]
    fn test_from_slice_rejects_bad_length() {
        assert!(matches!(
            SecretKey::from_slice(&[1, 2, 3]),
            Err(CoreError::InvalidKeyLength(3))
        ));
        let key = SecretKey::generate();
        let hex = hex::encode(key.as_bytes());
        assert_eq!(SecretKey::from_hex(&hex).unwrap(), key);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_any_flipped_byte_fails_to_open(
                plaintext in prop::collection::vec(any::<u8>(), 0..256),
                index in any::<prop::sample::Index>(),
                bit in 0u8..8,
            ) {
                let key = SecretKey::generate();
                let mut sealed = key.seal(&plaintext).unwrap();
                let at = index.index(sealed.len());
                sealed[at] ^= 1 << bit;
                prop_assert!(key.open(&sealed).is_err());
            }
        }
    }
}
