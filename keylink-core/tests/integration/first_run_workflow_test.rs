// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! First Run Workflow Integration Tests
//!
//! Tests for key creation on disk, restart, and wipe.

use keylink_core::storage::UnavailableKeyStorage;
use keylink_core::{KeySource, Keylink, KeylinkBuilder, KeylinkConfig, LinkPhase};
use tempfile::TempDir;

fn open(config: &KeylinkConfig) -> Keylink {
    KeylinkBuilder::new()
        .config(config.clone())
        .secure_storage(Box::new(UnavailableKeyStorage::new("no keychain")))
        .build()
        .unwrap()
}

/// Test: Key created on first run is still there after restart
#[test]
fn test_first_run_and_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = KeylinkConfig::with_data_dir(temp_dir.path());

    let (fingerprint, device_id) = {
        let keylink = open(&config);
        assert!(!keylink.has_encryption_key().unwrap());

        let created = keylink.create_encryption_key().unwrap();
        assert_eq!(created.source, KeySource::FallbackTier);
        assert!(created.warning.is_some());

        (created.fingerprint, keylink.device_id().unwrap())
    };

    let keylink = open(&config);
    assert!(keylink.has_encryption_key().unwrap());
    assert_eq!(keylink.active_fingerprint(), Some(fingerprint));
    assert_eq!(keylink.device_id().unwrap(), device_id);
    assert_eq!(keylink.link_state().phase(), LinkPhase::Linked);
}

/// Test: Wipe removes the key and the link flags from disk
#[test]
fn test_wipe_then_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = KeylinkConfig::with_data_dir(temp_dir.path());

    {
        let keylink = open(&config);
        keylink.report_encrypted_data_detected();
        keylink.create_encryption_key().unwrap();
        keylink.wipe().unwrap();
    }

    let keylink = open(&config);
    assert!(!keylink.has_encryption_key().unwrap());
    assert_eq!(keylink.link_state().phase(), LinkPhase::Unlinked);
    assert!(keylink.export_encryption_key().is_err());
}

/// Test: Ephemeral keys do not survive a restart
#[test]
fn test_ephemeral_key_is_lost_on_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = KeylinkConfig::with_data_dir(temp_dir.path());

    let build = || {
        KeylinkBuilder::new()
            .config(config.clone())
            .secure_storage(Box::new(UnavailableKeyStorage::new("no keychain")))
            .fallback_storage(Box::new(UnavailableKeyStorage::new("read-only")))
            .build()
            .unwrap()
    };

    {
        let keylink = build();
        let created = keylink.create_encryption_key().unwrap();
        assert_eq!(created.source, KeySource::Ephemeral);
        assert!(keylink.has_encryption_key().unwrap());
    }

    let keylink = build();
    assert!(!keylink.has_encryption_key().unwrap());
    assert!(!keylink.link_state().has_key());
}
