// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Secure Storage Module
//!
//! Backends for the two key storage tiers. The secure tier uses OS keychains
//! (macOS Keychain, Linux Secret Service, Windows Credential Manager, or the
//! mobile Keychain/Keystore through the FFI layer) when available; the
//! fallback tier is plain file storage in the app's data directory.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::storage::StorageError;

/// One storage tier holding raw key material under named entries.
///
/// A tier that cannot exist on the current platform reports
/// [`StorageError::Unavailable`] so the vault can treat it as empty.
pub trait SecureStorage: Send + Sync {
    /// Saves a key, replacing any previous value under `name`.
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError>;

    /// Loads a key; `None` when the entry was never written.
    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Deletes a key. Deleting a missing key is not an error.
    fn delete_key(&self, name: &str) -> Result<(), StorageError>;

    /// Checks if a key exists.
    fn has_key(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.load_key(name)?.is_some())
    }
}

/// Secure tier backed by the OS keychain through the `keyring` crate.
#[cfg(feature = "secure-storage")]
pub struct PlatformKeyring {
    service: String,
}

#[cfg(feature = "secure-storage")]
impl PlatformKeyring {
    /// `service` namespaces the entries, e.g. `"keylink"`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, name: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, name).map_err(|e| keychain_error("open", e))
    }
}

#[cfg(feature = "secure-storage")]
fn keychain_error(action: &str, err: keyring::Error) -> StorageError {
    match err {
        keyring::Error::PlatformFailure(e) | keyring::Error::NoStorageAccess(e) => {
            StorageError::Unavailable(format!("keychain {}: {}", action, e))
        }
        other => StorageError::Keychain(format!("keychain {}: {}", action, other)),
    }
}

#[cfg(feature = "secure-storage")]
impl SecureStorage for PlatformKeyring {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.entry(name)?
            .set_secret(key)
            .map_err(|e| keychain_error("save", e))
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.entry(name)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keychain_error("load", e)),
        }
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        match self.entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keychain_error("delete", e)),
        }
    }
}

/// File-based key storage for the fallback tier.
///
/// Keys are written as raw bytes, one owner-only file per entry, replaced
/// atomically.
pub struct FileKeyStorage {
    path: PathBuf,
}

impl FileKeyStorage {
    /// Stores entries as `<name>.key` files inside `path`, created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn key_file_path(&self, name: &str) -> PathBuf {
        // Entry names must stay inside the key directory
        let safe_name = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();
        self.path.join(format!("{}.key", safe_name))
    }
}

impl SecureStorage for FileKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.path)
            .map_err(|e| StorageError::Io(format!("Failed to create directory: {}", e)))?;

        let file_path = self.key_file_path(name);
        let tmp_path = file_path.with_extension("key.tmp");

        write_owner_only(&tmp_path, key).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            StorageError::Io(format!("Failed to write key file: {}", e))
        })?;

        // Rename is atomic on the same filesystem: readers see old or new, never half
        std::fs::rename(&tmp_path, &file_path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            StorageError::Io(format!("Failed to replace key file: {}", e))
        })
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let file_path = self.key_file_path(name);

        match std::fs::read(&file_path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(format!("Failed to read key file: {}", e))),
        }
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        let file_path = self.key_file_path(name);

        match std::fs::remove_file(&file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to delete key file: {}",
                e
            ))),
        }
    }
}

/// Writes `bytes` to a fresh file readable only by the current user.
fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    // A leftover file would keep its old mode
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// In-process key storage.
///
/// Nothing survives a restart. Used in tests and previews.
#[derive(Default)]
pub struct MemoryKeyStorage {
    keys: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStorage for MemoryKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.keys.lock().insert(name.to_string(), key.to_vec());
        Ok(())
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.keys.lock().get(name).cloned())
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        self.keys.lock().remove(name);
        Ok(())
    }
}

/// A storage tier that does not exist on this platform.
///
/// Stands in for the secure tier on simulators and builds without keychain
/// support; every operation fails with [`StorageError::Unavailable`].
pub struct UnavailableKeyStorage {
    reason: String,
}

impl UnavailableKeyStorage {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SecureStorage for UnavailableKeyStorage {
    fn save_key(&self, _name: &str, _key: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    fn load_key(&self, _name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    fn delete_key(&self, _name: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}
