// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Platform Callback Interfaces
//!
//! Traits implemented in Swift (iOS) or Kotlin (Android) to give the core
//! access to the platform keychain, device attributes, and to deliver link
//! events back to the app.

use std::sync::Arc;

use keylink_core::identity::{PlatformAttributes, PlatformIdentity};
use keylink_core::storage::{SecureStorage, StorageError};

use crate::types::MobileLinkState;

/// Result of reading a secret from the platform keychain.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum SecretLookup {
    Found { value: Vec<u8> },
    Missing,
    Failed { message: String },
}

/// Platform secure storage (iOS Keychain, Android Keystore).
#[uniffi::export(callback_interface)]
pub trait PlatformSecureStore: Send + Sync {
    /// Whether secure storage exists on this device.
    ///
    /// Return false on simulators or devices without a secure enclave.
    fn is_available(&self) -> bool;

    /// Store a secret under `name`, replacing any previous value.
    ///
    /// Returns empty string on success, error message on failure.
    fn save(&self, name: String, value: Vec<u8>) -> String;

    /// Read the secret stored under `name`.
    fn load(&self, name: String) -> SecretLookup;

    /// Remove the secret stored under `name`. Removing a missing secret
    /// succeeds.
    ///
    /// Returns empty string on success, error message on failure.
    fn delete(&self, name: String) -> String;
}

/// Platform device attributes used for the device id.
///
/// Return `None` for anything the platform does not expose.
#[uniffi::export(callback_interface)]
pub trait PlatformDeviceInfo: Send + Sync {
    /// Per-install identifier (e.g. identifierForVendor, Android ID).
    fn install_id(&self) -> Option<String>;

    /// Hardware model.
    fn device_model(&self) -> Option<String>;

    /// OS name and version.
    fn os_version(&self) -> Option<String>;
}

/// Receives link events.
#[uniffi::export(callback_interface)]
pub trait KeyLinkListener: Send + Sync {
    /// Data this device cannot decrypt was found.
    fn on_encrypted_data_detected(&self);

    /// The active key changed. `None` after a wipe.
    fn on_key_changed(&self, fingerprint: Option<String>);

    /// The link state changed.
    fn on_link_state_changed(&self, state: MobileLinkState);
}

/// Secure key tier backed by the platform keychain callback.
pub struct PlatformSecretStorage {
    store: Arc<dyn PlatformSecureStore>,
}

impl PlatformSecretStorage {
    pub fn new(store: Arc<dyn PlatformSecureStore>) -> Self {
        PlatformSecretStorage { store }
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.store.is_available() {
            Ok(())
        } else {
            Err(StorageError::Unavailable(
                "platform secure storage not available".to_string(),
            ))
        }
    }
}

fn check(result: String) -> Result<(), StorageError> {
    if result.is_empty() {
        Ok(())
    } else {
        Err(StorageError::Keychain(result))
    }
}

impl SecureStorage for PlatformSecretStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.ensure_available()?;
        check(self.store.save(name.to_string(), key.to_vec()))
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.ensure_available()?;
        match self.store.load(name.to_string()) {
            SecretLookup::Found { value } => Ok(Some(value)),
            SecretLookup::Missing => Ok(None),
            SecretLookup::Failed { message } => Err(StorageError::Keychain(message)),
        }
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        check(self.store.delete(name.to_string()))
    }
}

/// Device attributes read through the platform callback.
pub struct PlatformDeviceIdentity {
    info: Arc<dyn PlatformDeviceInfo>,
}

impl PlatformDeviceIdentity {
    pub fn new(info: Arc<dyn PlatformDeviceInfo>) -> Self {
        PlatformDeviceIdentity { info }
    }
}

impl PlatformIdentity for PlatformDeviceIdentity {
    fn attributes(&self) -> PlatformAttributes {
        PlatformAttributes {
            install_id: self.info.install_id(),
            device_model: self.info.device_model(),
            os_version: self.info.os_version(),
        }
    }
}
