// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Configuration
//!
//! Configuration types for the Keylink API layer.

use std::path::PathBuf;

use crate::storage::vault::DEFAULT_KEY_ENTRY;

/// Configuration for a Keylink instance.
#[derive(Debug, Clone)]
pub struct KeylinkConfig {
    /// SQLite database holding the link preferences.
    pub storage_path: PathBuf,

    /// Directory of the fallback key tier.
    pub key_dir: PathBuf,

    /// Service name used for the platform keychain entry.
    pub keyring_service: String,

    /// Entry name of the device key in both tiers.
    pub key_entry_name: String,

    /// Whether first-run key creation may fall back to a memory-only key
    /// when neither tier can persist one.
    pub allow_ephemeral: bool,
}

impl Default for KeylinkConfig {
    fn default() -> Self {
        KeylinkConfig {
            storage_path: PathBuf::from("./keylink_data/keylink.db"),
            key_dir: PathBuf::from("./keylink_data/keys"),
            keyring_service: "keylink".to_string(),
            key_entry_name: DEFAULT_KEY_ENTRY.to_string(),
            allow_ephemeral: true,
        }
    }
}

impl KeylinkConfig {
    /// Creates a configuration with everything stored under `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        KeylinkConfig {
            storage_path: data_dir.join("keylink.db"),
            key_dir: data_dir.join("keys"),
            ..Default::default()
        }
    }

    /// Sets the preference database path.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Sets the fallback key directory.
    pub fn with_key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = dir.into();
        self
    }

    /// Sets the keychain service name.
    pub fn with_keyring_service(mut self, service: impl Into<String>) -> Self {
        self.keyring_service = service.into();
        self
    }

    /// Sets the key entry name.
    pub fn with_key_entry_name(mut self, name: impl Into<String>) -> Self {
        self.key_entry_name = name.into();
        self
    }

    /// Refuses memory-only keys; key creation fails instead.
    pub fn without_ephemeral(mut self) -> Self {
        self.allow_ephemeral = false;
        self
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<(), String> {
        if self.key_entry_name.trim().is_empty() {
            return Err("key entry name must not be empty".to_string());
        }
        if self.keyring_service.trim().is_empty() {
            return Err("keyring service must not be empty".to_string());
        }
        if self.storage_path.as_os_str().is_empty() {
            return Err("storage path must not be empty".to_string());
        }
        Ok(())
    }
}
