// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for link::state
//!
//! New-device derivation, idempotent detection and persistence of the
//! link flags.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::fixtures::{Device, ZERO_KEY_HEX};
use common::strategies::link_flags_strategy;
use keylink_core::link::KeyInfo;
use keylink_core::storage::{FileKeyStorage, PreferenceKey, Preferences, UnavailableKeyStorage};
use keylink_core::*;
use proptest::prelude::*;
use tempfile::TempDir;

proptest! {
    #[test]
    fn prop_new_device_derivation((has_key, detected, dismissed) in link_flags_strategy()) {
        let key = has_key.then(|| KeyInfo {
            fingerprint: fingerprint(&EncryptionKey::from_bytes([7u8; 32])),
            source: KeySource::SecureTier,
        });
        let snapshot = LinkSnapshot::new(key, detected, dismissed);

        prop_assert_eq!(snapshot.is_new_device(), !has_key && detected && !dismissed);
        prop_assert_eq!(snapshot.has_key(), has_key);
        prop_assert_eq!(snapshot.fingerprint().is_some(), has_key);
        prop_assert_eq!(snapshot.phase() == LinkPhase::NewDeviceFlagged, snapshot.is_new_device());
    }

    #[test]
    fn prop_detection_is_idempotent(times in 1usize..20) {
        let device = Device::new();
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = changes.clone();
        device.keylink.on_link_state_changed(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..times {
            device.keylink.report_encrypted_data_detected();
        }

        prop_assert!(device.keylink.link_state().encrypted_data_detected());
        prop_assert_eq!(changes.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_fresh_install_scenario() {
    let device = Device::new();
    let keylink = &device.keylink;

    assert!(!keylink.has_encryption_key().unwrap());
    assert!(!keylink.is_new_device());

    keylink.report_encrypted_data_detected();
    assert!(keylink.is_new_device());

    let outcome = keylink.import_encryption_key(ZERO_KEY_HEX).unwrap();
    assert!(!keylink.is_new_device());
    assert_eq!(keylink.link_state().phase(), LinkPhase::Linked);
    assert_eq!(
        keylink.export_encryption_key().unwrap().fingerprint(),
        &outcome.fingerprint
    );
}

#[test]
fn test_import_emits_single_key_changed_after_state_commit() {
    let device = Device::new();
    let keylink = Arc::new(device.keylink);

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let observer = Arc::downgrade(&keylink);
    keylink.on_key_changed(move |fp| {
        // Listeners must already see the committed state
        let linked = observer
            .upgrade()
            .map(|k| k.link_state().has_key())
            .unwrap_or(false);
        seen_clone.lock().push((fp, linked));
    });

    let outcome = keylink.import_encryption_key(ZERO_KEY_HEX).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], (Some(outcome.fingerprint), true));
}

#[test]
fn test_dismiss_and_reprompt_round_trip() {
    let device = Device::new();
    let keylink = &device.keylink;
    keylink.report_encrypted_data_detected();

    keylink.dismiss_link_dialog().unwrap();
    assert_eq!(keylink.link_state().phase(), LinkPhase::DismissedUnlinked);
    assert!(!keylink.is_new_device());

    keylink.request_link_prompt().unwrap();
    assert_eq!(keylink.link_state().phase(), LinkPhase::NewDeviceFlagged);
}

#[test]
fn test_wipe_returns_to_unlinked() {
    let device = Device::new();
    let keylink = &device.keylink;
    keylink.report_encrypted_data_detected();
    keylink.import_encryption_key(ZERO_KEY_HEX).unwrap();

    keylink.wipe().unwrap();

    assert_eq!(keylink.link_state(), LinkSnapshot::default());
    assert!(!device.has_stored_key());
    for key in [
        PreferenceKey::KeyFingerprint,
        PreferenceKey::EncryptedDataDetected,
        PreferenceKey::HasSeenLinkDialog,
    ] {
        assert_eq!(device.prefs.get(key).unwrap(), None);
    }
}

#[test]
fn test_state_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = KeylinkConfig::with_data_dir(temp_dir.path());

    let build = |config: KeylinkConfig| {
        let key_dir = config.key_dir.clone();
        KeylinkBuilder::new()
            .config(config)
            .secure_storage(Box::new(UnavailableKeyStorage::new("simulator")))
            .fallback_storage(Box::new(FileKeyStorage::new(key_dir)))
            .build()
            .unwrap()
    };

    let fingerprint = {
        let keylink = build(config.clone());
        keylink.report_encrypted_data_detected();
        keylink.dismiss_link_dialog().unwrap();
        keylink.request_link_prompt().unwrap();
        keylink.dismiss_link_dialog().unwrap();
        // No secure tier, so the key lands in the file tier
        keylink
            .import_encryption_key(ZERO_KEY_HEX)
            .unwrap()
            .fingerprint
    };

    let keylink = build(config);
    let snapshot = keylink.link_state();
    assert!(snapshot.encrypted_data_detected());
    assert!(snapshot.dialog_dismissed());
    assert_eq!(snapshot.fingerprint(), Some(&fingerprint));
}
