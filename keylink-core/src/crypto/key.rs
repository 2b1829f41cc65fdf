// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Encryption Key
//!
//! The single 256-bit symmetric key protecting the user's data on this device.
//! The cipher that consumes it lives outside this crate; here the key is only
//! generated, moved between storage tiers and compared.

use ring::rand::SystemRandom;
use thiserror::Error;
use zeroize::Zeroize;

/// Length of the device encryption key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Errors constructing a key from raw input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Encryption key must be {KEY_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// 256-bit device encryption key.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LENGTH],
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key bytes in debug output
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl PartialEq for EncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for EncryptionKey {}

impl EncryptionKey {
    /// Generates a new random key from the system CSPRNG.
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let bytes = ring::rand::generate::<[u8; KEY_LENGTH]>(&rng)
            .expect("System RNG should not fail")
            .expose();
        EncryptionKey { bytes }
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        EncryptionKey { bytes }
    }

    /// Creates a key from a slice, rejecting anything but exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        Ok(EncryptionKey { bytes: array })
    }

    /// Returns a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.bytes
    }

    /// Returns the key as 64 lowercase hex characters.
    ///
    /// The caller owns the returned secret and should zeroize it when done.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_distinct_keys() {
        let a = EncryptionKey::generate();
        let b = EncryptionKey::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert_eq!(
            EncryptionKey::from_slice(&[0u8; 31]).unwrap_err(),
            KeyError::InvalidLength(31)
        );
        assert!(EncryptionKey::from_slice(&[0u8; 33]).is_err());
        assert!(EncryptionKey::from_slice(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = EncryptionKey::from_bytes([0xAB; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.to_lowercase().contains("abab"));
    }

    #[test]
    fn test_hex_is_lowercase_64_chars() {
        let key = EncryptionKey::from_bytes([0xCD; 32]);
        let hex = key.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex, "cd".repeat(32));
    }
}
