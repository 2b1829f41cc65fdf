// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Link Preferences
//!
//! Small durable records used by device identity and the link state.
//! Keys are namespaced so they never collide with unrelated app settings.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::StorageError;

/// Namespace prefix for every preference key.
pub const NAMESPACE: &str = "keylink";

const FLAG_TRUE: &str = "1";

/// Durable records owned by the linking subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    /// Stable per-install identifier.
    DeviceId,
    /// Cached fingerprint of the active key (re-derivable).
    KeyFingerprint,
    /// Set once the data layer has reported content this device cannot read.
    EncryptedDataDetected,
    /// Set when the user has seen and dismissed the link prompt.
    HasSeenLinkDialog,
}

impl PreferenceKey {
    /// All keys, in storage order.
    pub const ALL: [PreferenceKey; 4] = [
        PreferenceKey::DeviceId,
        PreferenceKey::KeyFingerprint,
        PreferenceKey::EncryptedDataDetected,
        PreferenceKey::HasSeenLinkDialog,
    ];

    /// Returns the namespaced storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKey::DeviceId => "keylink.device_id",
            PreferenceKey::KeyFingerprint => "keylink.key_fingerprint",
            PreferenceKey::EncryptedDataDetected => "keylink.encrypted_data_detected",
            PreferenceKey::HasSeenLinkDialog => "keylink.has_seen_link_dialog",
        }
    }
}

/// A single change in an atomic preference update. `None` removes the record.
pub type PreferenceChange = (PreferenceKey, Option<String>);

/// Key-value façade over the plain persistent store.
pub trait Preferences: Send + Sync {
    /// Reads a record.
    fn get(&self, key: PreferenceKey) -> Result<Option<String>, StorageError>;

    /// Applies all changes or none of them.
    fn apply(&self, changes: &[PreferenceChange]) -> Result<(), StorageError>;

    /// Writes a single record.
    fn set(&self, key: PreferenceKey, value: &str) -> Result<(), StorageError> {
        self.apply(&[(key, Some(value.to_string()))])
    }

    /// Removes a single record.
    fn remove(&self, key: PreferenceKey) -> Result<(), StorageError> {
        self.apply(&[(key, None)])
    }

    /// Reads a boolean flag; missing records read as false.
    fn get_flag(&self, key: PreferenceKey) -> Result<bool, StorageError> {
        Ok(self.get(key)?.as_deref() == Some(FLAG_TRUE))
    }
}

/// Encodes a boolean flag for [`Preferences::apply`].
pub fn flag_value(value: bool) -> Option<String> {
    value.then(|| FLAG_TRUE.to_string())
}

/// In-memory preferences for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<PreferenceKey, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: PreferenceKey) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(&key).cloned())
    }

    fn apply(&self, changes: &[PreferenceChange]) -> Result<(), StorageError> {
        let mut values = self.values.lock();
        for (key, value) in changes {
            match value {
                Some(v) => values.insert(*key, v.clone()),
                None => values.remove(key),
            };
        }
        Ok(())
    }
}
