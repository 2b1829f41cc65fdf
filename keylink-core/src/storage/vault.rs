// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key Vault
//!
//! Single owner of the device encryption key. Reads check the secure tier,
//! then the fallback tier, then the in-memory ephemeral slot. At most one
//! key is active at a time; writes replace it wholesale.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::secure::SecureStorage;
use super::StorageError;
use crate::crypto::EncryptionKey;

/// Default entry name for the device key in both tiers.
pub const DEFAULT_KEY_ENTRY: &str = "device_encryption_key";

/// Where the active key currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeySource {
    /// Hardware-backed or OS keychain storage.
    SecureTier,
    /// Plain persistent storage.
    FallbackTier,
    /// Memory only; lost on restart.
    Ephemeral,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::SecureTier => write!(f, "secure"),
            KeySource::FallbackTier => write!(f, "fallback"),
            KeySource::Ephemeral => write!(f, "ephemeral"),
        }
    }
}

/// Persistent tiers a key can be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTier {
    Secure,
    Fallback,
}

impl StorageTier {
    /// The source a key written to this tier reports.
    pub fn source(self) -> KeySource {
        match self {
            StorageTier::Secure => KeySource::SecureTier,
            StorageTier::Fallback => KeySource::FallbackTier,
        }
    }
}

/// The active key together with the tier holding it.
#[derive(Debug, Clone)]
pub struct StoredKey {
    pub key: EncryptionKey,
    pub source: KeySource,
}

/// The key is active, but not in secure storage.
///
/// Not an error: the operation succeeded, but the key may not survive a
/// reinstall and the user should be told.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Key stored outside secure storage: {reason}")]
pub struct DegradedStorageWarning {
    pub reason: String,
}

/// Result of [`KeyVault::store_preferred`].
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub source: KeySource,
    pub warning: Option<DegradedStorageWarning>,
}

/// Persists the device key across a secure and a fallback tier.
pub struct KeyVault {
    secure: Box<dyn SecureStorage>,
    fallback: Box<dyn SecureStorage>,
    ephemeral: Mutex<Option<EncryptionKey>>,
    entry: String,
}

impl KeyVault {
    /// Creates a vault over the two tiers using the default entry name.
    pub fn new(secure: Box<dyn SecureStorage>, fallback: Box<dyn SecureStorage>) -> Self {
        Self::with_entry_name(secure, fallback, DEFAULT_KEY_ENTRY)
    }

    /// Creates a vault storing the key under a custom entry name.
    pub fn with_entry_name(
        secure: Box<dyn SecureStorage>,
        fallback: Box<dyn SecureStorage>,
        entry: impl Into<String>,
    ) -> Self {
        KeyVault {
            secure,
            fallback,
            ephemeral: Mutex::new(None),
            entry: entry.into(),
        }
    }

    fn tier(&self, tier: StorageTier) -> &dyn SecureStorage {
        match tier {
            StorageTier::Secure => self.secure.as_ref(),
            StorageTier::Fallback => self.fallback.as_ref(),
        }
    }

    fn load_tier(&self, tier: StorageTier) -> Result<Option<EncryptionKey>, StorageError> {
        match self.tier(tier).load_key(&self.entry)? {
            Some(bytes) => EncryptionKey::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::CorruptKey(format!("{:?} tier: {}", tier, e))),
            None => Ok(None),
        }
    }

    /// Returns the active key and where it lives, or `None` if no tier holds one.
    ///
    /// A failing tier is tolerated when another tier holds the key. With no
    /// key anywhere, a tier error is returned unless the tier simply does not
    /// exist on this platform.
    pub fn get(&self) -> Result<Option<StoredKey>, StorageError> {
        let secure_error = match self.load_tier(StorageTier::Secure) {
            Ok(Some(key)) => {
                return Ok(Some(StoredKey {
                    key,
                    source: KeySource::SecureTier,
                }))
            }
            Ok(None) => None,
            Err(e) => Some(e),
        };

        let fallback_error = match self.load_tier(StorageTier::Fallback) {
            Ok(Some(key)) => {
                if let Some(e) = &secure_error {
                    tracing::warn!(error = %e, "secure tier unreadable, using fallback key");
                }
                return Ok(Some(StoredKey {
                    key,
                    source: KeySource::FallbackTier,
                }));
            }
            Ok(None) => None,
            Err(e) => Some(e),
        };

        if let Some(key) = self.ephemeral.lock().clone() {
            return Ok(Some(StoredKey {
                key,
                source: KeySource::Ephemeral,
            }));
        }

        match secure_error.into_iter().chain(fallback_error).find(|e| !is_unavailable(e)) {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Returns true if any tier holds a key.
    pub fn has_key(&self) -> Result<bool, StorageError> {
        Ok(self.get()?.is_some())
    }

    /// Writes the key to `tier`, replacing whatever key was active.
    pub fn set(&self, key: &EncryptionKey, tier: StorageTier) -> Result<(), StorageError> {
        self.tier(tier).save_key(&self.entry, key.as_bytes())?;
        *self.ephemeral.lock() = None;

        match tier {
            StorageTier::Secure => {
                // Secure wins on read, a stale fallback copy is harmless but untidy
                if let Err(e) = self.fallback.delete_key(&self.entry) {
                    tracing::warn!(error = %e, "failed to remove stale fallback key");
                }
            }
            StorageTier::Fallback => {
                if let Err(e) = self.secure.delete_key(&self.entry) {
                    // A readable stale secure copy would shadow the new key
                    if let Ok(Some(_)) = self.secure.load_key(&self.entry) {
                        let _ = self.fallback.delete_key(&self.entry);
                        return Err(e);
                    }
                }
            }
        }

        tracing::debug!(tier = ?tier, "stored device key");
        Ok(())
    }

    /// Writes the key to the secure tier, falling back to the plain tier.
    pub fn store_preferred(&self, key: &EncryptionKey) -> Result<StoreOutcome, StorageError> {
        match self.set(key, StorageTier::Secure) {
            Ok(()) => Ok(StoreOutcome {
                source: KeySource::SecureTier,
                warning: None,
            }),
            Err(secure_err) => {
                tracing::warn!(error = %secure_err, "secure tier write failed, using fallback");
                self.set(key, StorageTier::Fallback)?;
                Ok(StoreOutcome {
                    source: KeySource::FallbackTier,
                    warning: Some(DegradedStorageWarning {
                        reason: secure_err.to_string(),
                    }),
                })
            }
        }
    }

    /// Puts back a previously active key, or clears the vault if there was none.
    pub fn restore(&self, previous: Option<StoredKey>) -> Result<(), StorageError> {
        match previous {
            None => self.clear(),
            Some(StoredKey {
                key,
                source: KeySource::Ephemeral,
            }) => {
                self.clear()?;
                *self.ephemeral.lock() = Some(key);
                Ok(())
            }
            Some(StoredKey {
                key,
                source: KeySource::SecureTier,
            }) => self.set(&key, StorageTier::Secure),
            Some(StoredKey {
                key,
                source: KeySource::FallbackTier,
            }) => self.set(&key, StorageTier::Fallback),
        }
    }

    /// Removes the key from every tier. Every tier is attempted; the first
    /// failure is reported. Tiers that do not exist are skipped.
    pub fn clear(&self) -> Result<(), StorageError> {
        *self.ephemeral.lock() = None;

        let secure = self.secure.delete_key(&self.entry);
        let fallback = self.fallback.delete_key(&self.entry);

        [secure, fallback]
            .into_iter()
            .filter(|r| !matches!(r, Err(e) if is_unavailable(e)))
            .collect()
    }

    /// Generates a random key held only in memory.
    ///
    /// Used when neither tier can persist a key. Persisted keys are left
    /// untouched, and a persisted key still takes precedence on read.
    pub fn generate_ephemeral(&self) -> EncryptionKey {
        let key = EncryptionKey::generate();
        *self.ephemeral.lock() = Some(key.clone());
        key
    }
}

fn is_unavailable(err: &StorageError) -> bool {
    matches!(err, StorageError::Unavailable(_))
}
