// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Link Race Condition Tests
//!
//! Concurrent detection signals and overlapping imports on one install.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::fixtures::{FailingPreferences, GatedKeyStorage, A_KEY_HEX, ZERO_KEY_HEX};
use keylink_core::storage::MemoryKeyStorage;
use keylink_core::*;

const THREADS: usize = 8;

// =============================================================================
// Detection
// =============================================================================

/// Scenario: several data-layer threads hit undecryptable records at once
/// Only the first signal changes state
#[test]
fn test_concurrent_detection_changes_state_once() {
    let prefs = Arc::new(FailingPreferences::new());
    let keylink = Arc::new(
        KeylinkBuilder::new()
            .secure_storage(Box::new(MemoryKeyStorage::new()))
            .fallback_storage(Box::new(MemoryKeyStorage::new()))
            .preferences(prefs.clone())
            .build()
            .unwrap(),
    );

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = changes.clone();
    keylink.on_link_state_changed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let writes_before = prefs.write_count();

    let start = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let keylink = Arc::clone(&keylink);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                keylink.report_encrypted_data_detected();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(changes.load(Ordering::SeqCst), 1);
    assert_eq!(prefs.write_count() - writes_before, 1);
    assert!(keylink.is_new_device());
    assert_eq!(keylink.link_state().phase(), LinkPhase::NewDeviceFlagged);
}

// =============================================================================
// Import serialization
// =============================================================================

/// Scenario: a second import arrives while the first is still storing
/// Every entry point reports the import as in progress and changes nothing
#[test]
fn test_overlapping_imports_are_rejected() {
    let gate = Arc::new(Barrier::new(2));
    let keylink = Arc::new(
        KeylinkBuilder::new()
            .secure_storage(Box::new(GatedKeyStorage::new(gate.clone())))
            .fallback_storage(Box::new(MemoryKeyStorage::new()))
            .preferences(Arc::new(FailingPreferences::new()))
            .build()
            .unwrap(),
    );

    let first = {
        let keylink = Arc::clone(&keylink);
        thread::spawn(move || keylink.import_encryption_key(A_KEY_HEX))
    };
    // first import is now inside the key write
    gate.wait();

    assert!(keylink.controller().is_import_in_flight());
    assert!(matches!(
        keylink.import_encryption_key(ZERO_KEY_HEX),
        Err(KeylinkError::Link(LinkError::ImportInProgress))
    ));
    assert!(matches!(
        keylink.import_scanned_payload(ZERO_KEY_HEX),
        Err(KeylinkError::Link(LinkError::ImportInProgress))
    ));
    assert_eq!(
        keylink.controller().submit_manual(ZERO_KEY_HEX),
        ImportFeedback::Busy
    );

    let session = ScanSession::new();
    assert_eq!(
        keylink.controller().submit_scan(&session, ZERO_KEY_HEX),
        Some(ImportFeedback::Busy)
    );
    assert!(!session.is_locked());

    gate.wait();
    let outcome = first.join().unwrap().unwrap();

    assert!(!keylink.controller().is_import_in_flight());
    assert_eq!(keylink.active_fingerprint(), Some(outcome.fingerprint));
    assert_eq!(
        keylink.export_encryption_key().unwrap().key_hex(),
        A_KEY_HEX
    );
}

/// Scenario: the rejected import is retried after the first one finished
#[test]
fn test_import_accepted_after_previous_finishes() {
    let gate = Arc::new(Barrier::new(2));
    let keylink = Arc::new(
        KeylinkBuilder::new()
            .secure_storage(Box::new(GatedKeyStorage::new(gate.clone())))
            .fallback_storage(Box::new(MemoryKeyStorage::new()))
            .preferences(Arc::new(FailingPreferences::new()))
            .build()
            .unwrap(),
    );

    let first = {
        let keylink = Arc::clone(&keylink);
        thread::spawn(move || keylink.import_encryption_key(A_KEY_HEX))
    };
    gate.wait();
    gate.wait();
    first.join().unwrap().unwrap();

    let outcome = keylink.import_encryption_key(ZERO_KEY_HEX).unwrap();
    assert!(outcome.replaced);
    assert_eq!(
        keylink.export_encryption_key().unwrap().key_hex(),
        ZERO_KEY_HEX
    );
}
