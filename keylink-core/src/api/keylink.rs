// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keylink Orchestrator
//!
//! Wires the key vault, link state, transfer protocol and event bus
//! together behind one object.

use std::sync::Arc;

use super::config::KeylinkConfig;
use super::error::{KeylinkError, KeylinkResult};
use super::events::{EventBus, LinkEvent, LinkEventKind, SubscriptionId};
use crate::crypto::{EncryptionKey, Fingerprint};
use crate::identity::{DeviceId, DeviceIdentity, PlatformIdentity, StaticPlatformIdentity};
use crate::link::{
    ExportedKey, ImportOutcome, KeyInfo, KeyTransfer, LinkController, LinkError, LinkSnapshot,
    LinkState,
};
use crate::storage::{
    DegradedStorageWarning, FileKeyStorage, KeySource, KeyVault, MemoryKeyStorage,
    MemoryPreferences, Preferences, SecureStorage, Storage,
};

/// A key created on this device by [`Keylink::create_encryption_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedKey {
    pub fingerprint: Fingerprint,
    pub source: KeySource,
    /// Set when the key could not be stored in secure storage.
    pub warning: Option<DegradedStorageWarning>,
}

/// Main Keylink API.
///
/// # Example
///
/// ```ignore
/// use keylink_core::api::{Keylink, KeylinkConfig};
///
/// let keylink = Keylink::new(KeylinkConfig::with_data_dir("./data"))?;
///
/// keylink.on_key_changed(|fingerprint| println!("key changed: {:?}", fingerprint));
///
/// if !keylink.has_encryption_key()? {
///     keylink.create_encryption_key()?;
/// }
/// let exported = keylink.export_encryption_key()?;
/// println!("{}", exported.to_qr_image_string());
/// ```
pub struct Keylink {
    config: KeylinkConfig,
    vault: Arc<KeyVault>,
    events: Arc<EventBus>,
    state: Arc<LinkState>,
    transfer: Arc<KeyTransfer>,
    controller: Arc<LinkController>,
    identity: DeviceIdentity,
    detection: SubscriptionId,
}

impl Keylink {
    /// Creates a Keylink instance with on-disk storage.
    pub fn new(config: KeylinkConfig) -> KeylinkResult<Self> {
        KeylinkBuilder::new().config(config).build()
    }

    /// Creates a Keylink instance with in-memory storage (for testing).
    pub fn in_memory() -> KeylinkResult<Self> {
        KeylinkBuilder::new()
            .secure_storage(Box::new(MemoryKeyStorage::new()))
            .fallback_storage(Box::new(MemoryKeyStorage::new()))
            .preferences(Arc::new(MemoryPreferences::new()))
            .build()
    }

    // === Key Operations ===

    /// Returns true if this device holds an encryption key.
    pub fn has_encryption_key(&self) -> KeylinkResult<bool> {
        Ok(self.vault.has_key()?)
    }

    /// Returns the key in transfer form, for display on the source device.
    pub fn export_encryption_key(&self) -> KeylinkResult<ExportedKey> {
        Ok(self.transfer.export()?)
    }

    /// Imports a key typed or pasted by the user.
    pub fn import_encryption_key(&self, candidate: &str) -> KeylinkResult<ImportOutcome> {
        Ok(self.transfer.import(candidate)?)
    }

    /// Imports the key from a scanned QR payload.
    pub fn import_scanned_payload(&self, payload: &str) -> KeylinkResult<ImportOutcome> {
        Ok(self.transfer.import_scanned(payload)?)
    }

    /// Fingerprints raw key bytes.
    pub fn key_fingerprint(&self, key_bytes: &[u8]) -> KeylinkResult<Fingerprint> {
        Ok(Fingerprint::of_bytes(key_bytes)?)
    }

    /// Fingerprint of the active key, if any.
    pub fn active_fingerprint(&self) -> Option<Fingerprint> {
        self.state.snapshot().fingerprint().cloned()
    }

    /// Creates the first key on this device.
    ///
    /// Tries secure storage, then fallback storage, then (if allowed) a
    /// memory-only key. Never overwrites an existing key.
    pub fn create_encryption_key(&self) -> KeylinkResult<CreatedKey> {
        if self.vault.has_key()? {
            return Err(LinkError::KeyAlreadyExists.into());
        }

        let key = EncryptionKey::generate();
        let (key, source, warning) = match self.vault.store_preferred(&key) {
            Ok(outcome) => (key, outcome.source, outcome.warning),
            Err(e) if self.config.allow_ephemeral => {
                tracing::warn!(error = %e, "no persistent key storage, using ephemeral key");
                let warning = DegradedStorageWarning {
                    reason: format!("key is held in memory only: {}", e),
                };
                (self.vault.generate_ephemeral(), KeySource::Ephemeral, Some(warning))
            }
            Err(e) => return Err(e.into()),
        };

        let fingerprint = Fingerprint::of(&key);
        let info = KeyInfo {
            fingerprint: fingerprint.clone(),
            source,
        };
        if let Err(e) = self.state.commit_key(info, false) {
            tracing::warn!(error = %e, "link state commit failed, discarding new key");
            if let Err(rollback) = self.vault.restore(None) {
                tracing::warn!(error = %rollback, "key rollback failed");
            }
            return Err(e.into());
        }

        Ok(CreatedKey {
            fingerprint,
            source,
            warning,
        })
    }

    /// Removes the key from every tier and resets the link state.
    pub fn wipe(&self) -> KeylinkResult<()> {
        if let Err(e) = self.vault.clear() {
            tracing::warn!(error = %e, "failed to clear key vault");
            if let Err(refresh) = self.state.refresh(&self.vault) {
                tracing::warn!(error = %refresh, "failed to refresh link state");
            }
            return Err(e.into());
        }

        self.state.reset()?;
        tracing::info!("device key wiped");
        Ok(())
    }

    // === Link State ===

    /// Returns a copy of the current link state.
    pub fn link_state(&self) -> LinkSnapshot {
        self.state.snapshot()
    }

    pub fn is_new_device(&self) -> bool {
        self.state.is_new_device()
    }

    /// Records that the user dismissed the link prompt.
    pub fn dismiss_link_dialog(&self) -> KeylinkResult<()> {
        Ok(self.state.dismiss_dialog()?)
    }

    /// Shows the link prompt again after a dismissal.
    pub fn request_link_prompt(&self) -> KeylinkResult<()> {
        Ok(self.controller.reprompt()?)
    }

    /// Called by the data layer when it reads a record it cannot decrypt.
    pub fn report_encrypted_data_detected(&self) {
        self.events.emit(LinkEvent::EncryptedDataDetected);
    }

    /// Returns the stable per-install device id.
    pub fn device_id(&self) -> KeylinkResult<DeviceId> {
        Ok(self.identity.get_or_create()?)
    }

    /// Returns the link screen controller.
    pub fn controller(&self) -> &Arc<LinkController> {
        &self.controller
    }

    // === Events ===

    /// Subscribes to detection of undecryptable data.
    pub fn on_encrypted_data_detected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events
            .on(LinkEventKind::EncryptedDataDetected, move |_| callback())
    }

    /// Subscribes to key replacement. Receives `None` after a wipe.
    pub fn on_key_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Option<Fingerprint>) + Send + Sync + 'static,
    {
        self.events.on(LinkEventKind::KeyChanged, move |event| {
            if let LinkEvent::KeyChanged { fingerprint } = event {
                callback(fingerprint);
            }
        })
    }

    /// Subscribes to link state changes.
    pub fn on_link_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(LinkSnapshot) + Send + Sync + 'static,
    {
        self.events.on(LinkEventKind::LinkStateChanged, move |event| {
            if let LinkEvent::LinkStateChanged(snapshot) = event {
                callback(snapshot);
            }
        })
    }

    /// Removes a subscription made through this instance or its event bus.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Returns the event bus.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Returns the configuration.
    pub fn config(&self) -> &KeylinkConfig {
        &self.config
    }
}

impl Drop for Keylink {
    fn drop(&mut self) {
        self.events.unsubscribe(self.detection);
    }
}

/// Builder for Keylink instances.
pub struct KeylinkBuilder {
    config: KeylinkConfig,
    secure: Option<Box<dyn SecureStorage>>,
    fallback: Option<Box<dyn SecureStorage>>,
    preferences: Option<Arc<dyn Preferences>>,
    platform: Option<Arc<dyn PlatformIdentity>>,
    events: Option<Arc<EventBus>>,
}

impl KeylinkBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        KeylinkBuilder {
            config: KeylinkConfig::default(),
            secure: None,
            fallback: None,
            preferences: None,
            platform: None,
            events: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: KeylinkConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the secure tier backend. Defaults to the platform keychain
    /// when built with `secure-storage`.
    pub fn secure_storage(mut self, storage: Box<dyn SecureStorage>) -> Self {
        self.secure = Some(storage);
        self
    }

    /// Sets the fallback tier backend. Defaults to files under `key_dir`.
    pub fn fallback_storage(mut self, storage: Box<dyn SecureStorage>) -> Self {
        self.fallback = Some(storage);
        self
    }

    /// Sets the preference store. Defaults to SQLite at `storage_path`.
    pub fn preferences(mut self, preferences: Arc<dyn Preferences>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Sets the platform attribute provider used for the device id.
    pub fn platform(mut self, platform: Arc<dyn PlatformIdentity>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Shares an existing event bus, e.g. one the data layer already holds.
    pub fn events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Builds the Keylink instance.
    pub fn build(self) -> KeylinkResult<Keylink> {
        let config = self.config;
        config.validate().map_err(KeylinkError::Configuration)?;

        let secure = self
            .secure
            .unwrap_or_else(|| default_secure_storage(&config));
        let fallback = self
            .fallback
            .unwrap_or_else(|| Box::new(FileKeyStorage::new(&config.key_dir)));

        let preferences: Arc<dyn Preferences> = match self.preferences {
            Some(preferences) => preferences,
            None => {
                if let Some(parent) = config.storage_path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| KeylinkError::Configuration(e.to_string()))?;
                }
                Arc::new(Storage::open(&config.storage_path)?)
            }
        };

        let platform = self
            .platform
            .unwrap_or_else(|| Arc::new(StaticPlatformIdentity::default()));
        let events = self.events.unwrap_or_default();

        let vault = Arc::new(KeyVault::with_entry_name(
            secure,
            fallback,
            config.key_entry_name.clone(),
        ));
        let state = Arc::new(LinkState::load(
            preferences.clone(),
            events.clone(),
            &vault,
        )?);
        let transfer = Arc::new(KeyTransfer::new(vault.clone(), state.clone()));
        let controller = Arc::new(LinkController::new(state.clone(), transfer.clone()));
        let identity = DeviceIdentity::new(preferences, platform);

        // Weak, so the bus never keeps the state alive
        let detector = Arc::downgrade(&state);
        let detection = events.on(LinkEventKind::EncryptedDataDetected, move |_| {
            if let Some(state) = detector.upgrade() {
                if let Err(e) = state.mark_encrypted_data_detected() {
                    tracing::warn!(error = %e, "failed to record encrypted data detection");
                }
            }
        });

        Ok(Keylink {
            config,
            vault,
            events,
            state,
            transfer,
            controller,
            identity,
            detection,
        })
    }
}

impl Default for KeylinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "secure-storage")]
fn default_secure_storage(config: &KeylinkConfig) -> Box<dyn SecureStorage> {
    Box::new(crate::storage::PlatformKeyring::new(
        config.keyring_service.clone(),
    ))
}

#[cfg(not(feature = "secure-storage"))]
fn default_secure_storage(_config: &KeylinkConfig) -> Box<dyn SecureStorage> {
    Box::new(crate::storage::UnavailableKeyStorage::new(
        "platform keychain support not compiled in",
    ))
}
