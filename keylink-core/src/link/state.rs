// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Link State
//!
//! Tracks whether this install holds the key, whether encrypted data it
//! cannot read has been seen, and whether the user dismissed the link
//! prompt. "New device" is always derived from those three facts and never
//! stored.
//!
//! Transitions:
//! - Unlinked → NewDeviceFlagged: encrypted data detected (derived)
//! - NewDeviceFlagged → Linked: key imported (also dismisses the prompt)
//! - NewDeviceFlagged → DismissedUnlinked: prompt dismissed
//! - DismissedUnlinked → NewDeviceFlagged: explicit re-prompt
//! - any → Unlinked: wipe

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::api::events::{EventBus, LinkEvent};
use crate::crypto::Fingerprint;
use crate::storage::{flag_value, KeySource, KeyVault, PreferenceKey, Preferences, StorageError};

/// Public facts about the active key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub fingerprint: Fingerprint,
    pub source: KeySource,
}

/// Named view over a [`LinkSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkPhase {
    /// No key, no unreadable data seen.
    Unlinked,
    /// No key, unreadable data seen, prompt not dismissed.
    NewDeviceFlagged,
    /// No key, unreadable data seen, user dismissed the prompt.
    DismissedUnlinked,
    /// This device holds a key.
    Linked,
}

/// Read-only copy of the link state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    key: Option<KeyInfo>,
    encrypted_data_detected: bool,
    dialog_dismissed: bool,
}

impl LinkSnapshot {
    pub fn new(key: Option<KeyInfo>, encrypted_data_detected: bool, dialog_dismissed: bool) -> Self {
        LinkSnapshot {
            key,
            encrypted_data_detected,
            dialog_dismissed,
        }
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    pub fn key(&self) -> Option<&KeyInfo> {
        self.key.as_ref()
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.key.as_ref().map(|k| &k.fingerprint)
    }

    pub fn key_source(&self) -> Option<KeySource> {
        self.key.as_ref().map(|k| k.source)
    }

    pub fn encrypted_data_detected(&self) -> bool {
        self.encrypted_data_detected
    }

    pub fn dialog_dismissed(&self) -> bool {
        self.dialog_dismissed
    }

    /// True when this install sees data it cannot decrypt and the user has
    /// not yet linked or dismissed the prompt.
    pub fn is_new_device(&self) -> bool {
        !self.has_key() && self.encrypted_data_detected && !self.dialog_dismissed
    }

    pub fn phase(&self) -> LinkPhase {
        if self.has_key() {
            LinkPhase::Linked
        } else if !self.encrypted_data_detected {
            LinkPhase::Unlinked
        } else if self.dialog_dismissed {
            LinkPhase::DismissedUnlinked
        } else {
            LinkPhase::NewDeviceFlagged
        }
    }
}

/// Owner of the durable link flags and the current snapshot.
///
/// All mutation goes through the transition methods; callers only ever see
/// cloned snapshots.
pub struct LinkState {
    prefs: Arc<dyn Preferences>,
    events: Arc<EventBus>,
    snapshot: Mutex<LinkSnapshot>,
}

impl LinkState {
    /// Builds the state from the vault and the persisted flags.
    pub fn load(
        prefs: Arc<dyn Preferences>,
        events: Arc<EventBus>,
        vault: &KeyVault,
    ) -> Result<Self, StorageError> {
        let snapshot = LinkSnapshot {
            key: None,
            encrypted_data_detected: prefs.get_flag(PreferenceKey::EncryptedDataDetected)?,
            dialog_dismissed: prefs.get_flag(PreferenceKey::HasSeenLinkDialog)?,
        };

        let state = LinkState {
            prefs,
            events,
            snapshot: Mutex::new(snapshot),
        };
        match read_key(vault) {
            Ok(key) => state.sync_key(key)?,
            // Import and wipe both recover from this
            Err(e) => tracing::warn!(error = %e, "stored key unreadable, starting without a key"),
        }

        tracing::debug!(phase = ?state.snapshot().phase(), "loaded link state");
        Ok(state)
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> LinkSnapshot {
        self.snapshot.lock().clone()
    }

    pub fn is_new_device(&self) -> bool {
        self.snapshot.lock().is_new_device()
    }

    /// Re-reads the key from the vault and refreshes the fingerprint cache.
    pub fn refresh(&self, vault: &KeyVault) -> Result<(), StorageError> {
        self.sync_key(read_key(vault)?)
    }

    fn sync_key(&self, key: Option<KeyInfo>) -> Result<(), StorageError> {
        let cached = self.prefs.get(PreferenceKey::KeyFingerprint)?;
        let current = key.as_ref().map(|k| k.fingerprint.as_str().to_string());
        if cached != current {
            tracing::debug!("refreshing cached key fingerprint");
            self.prefs
                .apply(&[(PreferenceKey::KeyFingerprint, current)])?;
        }

        self.update(|s| s.key = key);
        Ok(())
    }

    /// Records that the data layer saw data this device cannot decrypt.
    ///
    /// Idempotent: returns `true` only on the call that set the flag.
    pub fn mark_encrypted_data_detected(&self) -> Result<bool, StorageError> {
        let next = {
            let mut snapshot = self.snapshot.lock();
            if snapshot.encrypted_data_detected {
                return Ok(false);
            }
            self.prefs
                .apply(&[(PreferenceKey::EncryptedDataDetected, flag_value(true))])?;
            snapshot.encrypted_data_detected = true;
            snapshot.clone()
        };

        tracing::info!(new_device = next.is_new_device(), "encrypted data detected");
        self.events.emit(LinkEvent::LinkStateChanged(next));
        Ok(true)
    }

    /// Records that the user dismissed the link prompt.
    pub fn dismiss_dialog(&self) -> Result<(), StorageError> {
        self.set_dialog_dismissed(true)
    }

    /// Clears the dismissal so the link prompt is shown again.
    pub fn request_reprompt(&self) -> Result<(), StorageError> {
        self.set_dialog_dismissed(false)
    }

    fn set_dialog_dismissed(&self, dismissed: bool) -> Result<(), StorageError> {
        let next = {
            let mut snapshot = self.snapshot.lock();
            if snapshot.dialog_dismissed == dismissed {
                return Ok(());
            }
            self.prefs
                .apply(&[(PreferenceKey::HasSeenLinkDialog, flag_value(dismissed))])?;
            snapshot.dialog_dismissed = dismissed;
            snapshot.clone()
        };

        tracing::debug!(dismissed, "link prompt dismissal changed");
        self.events.emit(LinkEvent::LinkStateChanged(next));
        Ok(())
    }

    /// Records a newly stored key and broadcasts exactly one `KeyChanged`.
    ///
    /// The fingerprint cache and the dismissal flag are written in one
    /// atomic update, then the snapshot is replaced in one assignment. On a
    /// storage failure nothing changes and nothing is emitted.
    pub fn commit_key(&self, key: KeyInfo, dismiss_dialog: bool) -> Result<(), StorageError> {
        let next = {
            let mut snapshot = self.snapshot.lock();

            let mut changes = vec![(
                PreferenceKey::KeyFingerprint,
                Some(key.fingerprint.as_str().to_string()),
            )];
            if dismiss_dialog {
                changes.push((PreferenceKey::HasSeenLinkDialog, flag_value(true)));
            }
            self.prefs.apply(&changes)?;

            *snapshot = LinkSnapshot {
                key: Some(key.clone()),
                encrypted_data_detected: snapshot.encrypted_data_detected,
                dialog_dismissed: snapshot.dialog_dismissed || dismiss_dialog,
            };
            snapshot.clone()
        };

        tracing::info!(fingerprint = %key.fingerprint, source = %key.source, "device key replaced");
        self.events.emit(LinkEvent::KeyChanged {
            fingerprint: Some(key.fingerprint),
        });
        self.events.emit(LinkEvent::LinkStateChanged(next));
        Ok(())
    }

    /// Returns to the initial state after the key was wiped.
    ///
    /// The snapshot always drops the key (the vault no longer holds one);
    /// the durable flags are cleared in one atomic update.
    pub fn reset(&self) -> Result<(), StorageError> {
        let (result, next) = {
            let mut snapshot = self.snapshot.lock();
            let result = self.prefs.apply(&[
                (PreferenceKey::KeyFingerprint, None),
                (PreferenceKey::EncryptedDataDetected, None),
                (PreferenceKey::HasSeenLinkDialog, None),
            ]);

            match &result {
                Ok(()) => *snapshot = LinkSnapshot::default(),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to clear link flags after wipe");
                    snapshot.key = None;
                }
            }
            (result, snapshot.clone())
        };

        tracing::info!("link state reset");
        self.events.emit(LinkEvent::KeyChanged { fingerprint: None });
        self.events.emit(LinkEvent::LinkStateChanged(next));
        result
    }

    fn update(&self, change: impl FnOnce(&mut LinkSnapshot)) {
        let next = {
            let mut snapshot = self.snapshot.lock();
            let before = snapshot.clone();
            change(&mut snapshot);
            if *snapshot == before {
                return;
            }
            snapshot.clone()
        };
        self.events.emit(LinkEvent::LinkStateChanged(next));
    }
}

fn read_key(vault: &KeyVault) -> Result<Option<KeyInfo>, StorageError> {
    Ok(vault.get()?.map(|stored| KeyInfo {
        fingerprint: Fingerprint::of(&stored.key),
        source: stored.source,
    }))
}
