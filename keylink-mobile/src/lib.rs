// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keylink Mobile Bindings
//!
//! UniFFI bindings for Android and iOS platforms.
//! Exposes the key lifecycle, link state and import screen of keylink-core.
//! The platform keychain and device attributes are supplied by the app
//! through callback interfaces.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use keylink_core::api::SubscriptionId;
use keylink_core::{Fingerprint, Keylink, KeylinkBuilder, KeylinkConfig, ScanSession};

// === Modules ===

mod error;
mod platform;
mod types;

// Re-export public types
pub use error::MobileError;
pub use platform::{
    KeyLinkListener, PlatformDeviceIdentity, PlatformDeviceInfo, PlatformSecretStorage,
    PlatformSecureStore, SecretLookup,
};
pub use types::{
    MobileCreatedKey, MobileEntryMode, MobileExportedKey, MobileImportFeedback,
    MobileImportResult, MobileImportStatus, MobileKeySource, MobileLinkPhase, MobileLinkPrompt,
    MobileLinkState,
};

uniffi::setup_scaffolding!();

// === Free functions ===

/// Installs a log subscriber writing to stderr.
///
/// `filter` uses `RUST_LOG` syntax, e.g. `"keylink_core=debug"`. Calling it
/// again after a subscriber is installed has no effect.
#[uniffi::export]
pub fn init_logging(filter: String) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .try_init();
    if result.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}

/// Fingerprint of raw key bytes, for display next to a QR code.
#[uniffi::export]
pub fn key_fingerprint(key_bytes: Vec<u8>) -> Result<String, MobileError> {
    Ok(Fingerprint::of_bytes(&key_bytes)?.to_string())
}

// === Main interface ===

/// Main Keylink Mobile interface.
#[derive(uniffi::Object)]
pub struct KeylinkMobile {
    keylink: Keylink,
    scan_session: ScanSession,
    listeners: Mutex<HashMap<u64, Vec<SubscriptionId>>>,
    next_listener: AtomicU64,
}

impl KeylinkMobile {
    fn from_keylink(keylink: Keylink) -> Arc<Self> {
        Arc::new(KeylinkMobile {
            keylink,
            scan_session: ScanSession::new(),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
        })
    }
}

#[uniffi::export]
impl KeylinkMobile {
    /// Create a KeylinkMobile instance.
    ///
    /// Preferences and the fallback key file live under `data_dir`; the
    /// secure tier goes through `secure_store`.
    #[uniffi::constructor]
    pub fn new(
        data_dir: String,
        secure_store: Box<dyn PlatformSecureStore>,
        device_info: Box<dyn PlatformDeviceInfo>,
    ) -> Result<Arc<Self>, MobileError> {
        let data_path = PathBuf::from(&data_dir);
        std::fs::create_dir_all(&data_path)
            .map_err(|e| MobileError::StorageError(e.to_string()))?;

        let secure_store: Arc<dyn PlatformSecureStore> = Arc::from(secure_store);
        let device_info: Arc<dyn PlatformDeviceInfo> = Arc::from(device_info);

        let keylink = KeylinkBuilder::new()
            .config(KeylinkConfig::with_data_dir(&data_path))
            .secure_storage(Box::new(PlatformSecretStorage::new(secure_store)))
            .platform(Arc::new(PlatformDeviceIdentity::new(device_info)))
            .build()?;

        tracing::info!(data_dir = %data_path.display(), "keylink mobile initialized");
        Ok(Self::from_keylink(keylink))
    }

    // === Key lifecycle ===

    pub fn has_encryption_key(&self) -> Result<bool, MobileError> {
        Ok(self.keylink.has_encryption_key()?)
    }

    /// Create the first key on this device.
    pub fn create_encryption_key(&self) -> Result<MobileCreatedKey, MobileError> {
        Ok(self.keylink.create_encryption_key()?.into())
    }

    /// Export the key for display on this (source) device.
    pub fn export_encryption_key(&self) -> Result<MobileExportedKey, MobileError> {
        let exported = self.keylink.export_encryption_key()?;
        Ok(MobileExportedKey::from(&exported))
    }

    /// Export the key as a text QR image, for terminals and debug screens.
    pub fn export_qr_image(&self) -> Result<String, MobileError> {
        Ok(self.keylink.export_encryption_key()?.to_qr_image_string())
    }

    /// Import a key directly, bypassing the import screen state.
    ///
    /// Shares the in-flight guard with the import screen, so this fails with
    /// `ImportInProgress` while a screen import runs.
    pub fn import_encryption_key(
        &self,
        candidate: String,
    ) -> Result<MobileImportResult, MobileError> {
        Ok(self.keylink.import_encryption_key(&candidate)?.into())
    }

    /// Submit text typed or pasted on the import screen.
    pub fn submit_manual_key(&self, text: String) -> MobileImportFeedback {
        self.keylink.controller().submit_manual(&text).into()
    }

    /// Hand a scanner frame to the import screen.
    ///
    /// Returns `None` while no key is visible and for duplicate frames after
    /// a key was accepted.
    pub fn import_scanned_payload(&self, payload: String) -> Option<MobileImportFeedback> {
        self.keylink
            .controller()
            .submit_scan(&self.scan_session, &payload)
            .map(Into::into)
    }

    /// Re-arm the scanner, e.g. when the import screen is reopened.
    pub fn reset_scan_session(&self) {
        self.scan_session.reset();
    }

    /// Remove the key from every tier and reset the link state.
    pub fn wipe(&self) -> Result<(), MobileError> {
        Ok(self.keylink.wipe()?)
    }

    pub fn device_id(&self) -> Result<String, MobileError> {
        Ok(self.keylink.device_id()?.to_string())
    }

    // === Link state ===

    pub fn link_state(&self) -> MobileLinkState {
        MobileLinkState::from(&self.keylink.link_state())
    }

    pub fn is_new_device(&self) -> bool {
        self.keylink.is_new_device()
    }

    /// What to show: nothing, the link dialog, or a banner.
    pub fn link_prompt(&self) -> MobileLinkPrompt {
        self.keylink.controller().prompt().into()
    }

    /// Call after showing the link dialog.
    pub fn dialog_presented(&self) {
        self.keylink.controller().dialog_presented();
    }

    pub fn dismiss_link_dialog(&self) -> Result<(), MobileError> {
        Ok(self.keylink.controller().dismiss()?)
    }

    pub fn request_link_prompt(&self) -> Result<(), MobileError> {
        Ok(self.keylink.request_link_prompt()?)
    }

    /// Called by the data layer when it reads a record it cannot decrypt.
    pub fn report_encrypted_data_detected(&self) {
        self.keylink.report_encrypted_data_detected();
    }

    // === Import screen ===

    pub fn is_import_in_flight(&self) -> bool {
        self.keylink.controller().is_import_in_flight()
    }

    pub fn entry_mode(&self) -> MobileEntryMode {
        self.keylink.controller().entry_mode().into()
    }

    pub fn set_entry_mode(&self, mode: MobileEntryMode) {
        self.keylink.controller().set_entry_mode(mode.into());
    }

    /// Camera access was refused; the screen switches to manual paste.
    pub fn camera_permission_denied(&self) -> MobileEntryMode {
        self.keylink.controller().camera_permission_denied().into()
    }

    // === Listeners ===

    /// Register a listener for link events. Returns an id for removal.
    pub fn add_listener(&self, listener: Box<dyn KeyLinkListener>) -> u64 {
        let listener: Arc<dyn KeyLinkListener> = Arc::from(listener);

        let detected = listener.clone();
        let changed = listener.clone();
        let subscriptions = vec![
            self.keylink
                .on_encrypted_data_detected(move || detected.on_encrypted_data_detected()),
            self.keylink.on_key_changed(move |fingerprint| {
                changed.on_key_changed(fingerprint.map(|f| f.to_string()))
            }),
            self.keylink.on_link_state_changed(move |snapshot| {
                listener.on_link_state_changed(MobileLinkState::from(&snapshot))
            }),
        ];

        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, subscriptions);
        id
    }

    /// Remove a listener. Returns false for unknown ids.
    pub fn remove_listener(&self, id: u64) -> bool {
        let Some(subscriptions) = self.listeners.lock().remove(&id) else {
            return false;
        };
        for subscription in subscriptions {
            self.keylink.unsubscribe(subscription);
        }
        true
    }
}
