// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Test Fixtures
//!
//! Storage doubles with injectable failures, and a ready-made device.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use keylink_core::storage::{
    MemoryKeyStorage, MemoryPreferences, PreferenceChange, PreferenceKey, Preferences,
    SecureStorage, StorageError,
};
use keylink_core::{Keylink, KeylinkBuilder};

/// 64 zero-hex characters.
pub const ZERO_KEY_HEX: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// 64 'a' characters.
pub const A_KEY_HEX: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Preferences whose writes can be switched to fail, and which count the
/// writes that succeeded.
#[derive(Default)]
pub struct FailingPreferences {
    inner: MemoryPreferences,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FailingPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Preferences for FailingPreferences {
    fn get(&self, key: PreferenceKey) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn apply(&self, changes: &[PreferenceChange]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io("injected write failure".to_string()));
        }
        self.inner.apply(changes)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Key storage whose contents stay visible to the test after the vault
/// takes ownership, and whose writes can be switched to fail.
#[derive(Clone, Default)]
pub struct SharedKeyStorage {
    inner: Arc<MemoryKeyStorage>,
    fail_writes: Arc<AtomicBool>,
}

impl SharedKeyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SecureStorage for SharedKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Keychain("injected write failure".to_string()));
        }
        self.inner.save_key(name, key)
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.load_key(name)
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        self.inner.delete_key(name)
    }
}

/// Key storage whose first write stops at a two-party barrier twice: once
/// to signal that the write started, once to wait for release.
pub struct GatedKeyStorage {
    inner: MemoryKeyStorage,
    gate: Arc<Barrier>,
    armed: AtomicBool,
}

impl GatedKeyStorage {
    pub fn new(gate: Arc<Barrier>) -> Self {
        GatedKeyStorage {
            inner: MemoryKeyStorage::new(),
            gate,
            armed: AtomicBool::new(true),
        }
    }
}

impl SecureStorage for GatedKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.gate.wait();
            self.gate.wait();
        }
        self.inner.save_key(name, key)
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.load_key(name)
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        self.inner.delete_key(name)
    }
}

/// One simulated install with inspectable storage.
pub struct Device {
    pub keylink: Keylink,
    pub secure: SharedKeyStorage,
    pub fallback: SharedKeyStorage,
    pub prefs: Arc<FailingPreferences>,
}

impl Device {
    pub fn new() -> Self {
        let secure = SharedKeyStorage::new();
        let fallback = SharedKeyStorage::new();
        let prefs = Arc::new(FailingPreferences::new());

        let keylink = KeylinkBuilder::new()
            .secure_storage(Box::new(secure.clone()))
            .fallback_storage(Box::new(fallback.clone()))
            .preferences(prefs.clone())
            .build()
            .unwrap();

        Device {
            keylink,
            secure,
            fallback,
            prefs,
        }
    }

    /// True if either persistent tier holds anything.
    pub fn has_stored_key(&self) -> bool {
        let entry = &self.keylink.config().key_entry_name;
        self.secure.has_key(entry).unwrap() || self.fallback.has_key(entry).unwrap()
    }
}
