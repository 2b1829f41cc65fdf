// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key Fingerprints
//!
//! Short, human-comparable tokens derived from the device key. Two devices
//! show the same fingerprint exactly when they hold the same key bytes.

use ring::digest::{Context, SHA256};
use serde::{Deserialize, Serialize};

use super::key::{EncryptionKey, KeyError};

/// Domain separation label for fingerprint hashing.
const FINGERPRINT_INFO: &[u8] = b"Keylink_Key_Fingerprint";

/// Number of digest bytes kept in the displayed fingerprint.
pub const FINGERPRINT_BYTES: usize = 6;

/// Human-verifiable fingerprint of an encryption key, e.g. `3F2A 9B01 C4D7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints a key.
    pub fn of(key: &EncryptionKey) -> Self {
        let mut ctx = Context::new(&SHA256);
        ctx.update(FINGERPRINT_INFO);
        ctx.update(key.as_bytes());
        let digest = ctx.finish();

        // Format as groups of 4 hex chars for readability
        let hex = hex::encode_upper(&digest.as_ref()[..FINGERPRINT_BYTES]);
        let grouped = hex
            .as_bytes()
            .chunks(4)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect::<Vec<_>>()
            .join(" ");

        Fingerprint(grouped)
    }

    /// Fingerprints raw key bytes, which must be exactly 32 bytes long.
    pub fn of_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let key = EncryptionKey::from_slice(bytes)?;
        Ok(Self::of(&key))
    }

    /// Returns the display form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints a key. Pure: no I/O, same bytes give the same string.
pub fn fingerprint(key: &EncryptionKey) -> Fingerprint {
    Fingerprint::of(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint(&EncryptionKey::from_bytes([0u8; 32]));
        let s = fp.as_str();

        assert_eq!(s.len(), 14);
        assert_eq!(s.split(' ').count(), 3);
        assert!(s
            .chars()
            .all(|c| c == ' ' || c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_does_not_leak_key_hex() {
        let key = EncryptionKey::from_bytes([0x11; 32]);
        let fp = fingerprint(&key).as_str().replace(' ', "").to_lowercase();
        assert!(!key.to_hex().contains(&fp));
    }

    #[test]
    fn test_fingerprint_differs_for_single_bit_flip() {
        let mut bytes = [0x5Au8; 32];
        let a = fingerprint(&EncryptionKey::from_bytes(bytes));
        bytes[31] ^= 0x01;
        let b = fingerprint(&EncryptionKey::from_bytes(bytes));
        assert_ne!(a, b);
    }

    #[test]
    fn test_of_bytes_rejects_short_input() {
        assert!(Fingerprint::of_bytes(&[1, 2, 3]).is_err());
    }
}
