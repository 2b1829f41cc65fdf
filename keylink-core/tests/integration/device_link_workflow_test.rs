// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Link Workflow Integration Tests
//!
//! Tests for moving the key from an existing device to a new one through
//! the link controller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use keylink_core::{EntryMode, ImportFeedback, Keylink, LinkPhase, LinkPrompt, ScanSession};

/// Test: Full QR link workflow between two devices
#[test]
fn test_full_qr_link_workflow() {
    // Existing device with a key
    let phone = Keylink::in_memory().unwrap();
    let created = phone.create_encryption_key().unwrap();

    // New device sees data it cannot read
    let tablet = Keylink::in_memory().unwrap();
    let key_changes = Arc::new(AtomicUsize::new(0));
    let counter = key_changes.clone();
    tablet.on_key_changed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tablet.report_encrypted_data_detected();
    let controller = tablet.controller();
    assert_eq!(controller.prompt(), LinkPrompt::Dialog);
    controller.dialog_presented();

    // Phone shows the QR, tablet scans it many times per second
    let exported = phone.export_encryption_key().unwrap();
    let payload = format!("keylink://link?key={}", exported.key_hex());
    let session = ScanSession::new();

    assert_eq!(controller.submit_scan(&session, "blurry frame"), None);
    let feedback = controller.submit_scan(&session, &payload).unwrap();
    for _ in 0..10 {
        assert_eq!(controller.submit_scan(&session, &payload), None);
    }

    assert_eq!(
        feedback,
        ImportFeedback::Linked {
            fingerprint: created.fingerprint.clone(),
            degraded_warning: None,
        }
    );
    assert_eq!(key_changes.load(Ordering::SeqCst), 1);
    assert_eq!(tablet.active_fingerprint(), Some(created.fingerprint));
    assert_eq!(tablet.link_state().phase(), LinkPhase::Linked);
    assert_eq!(controller.prompt(), LinkPrompt::None);
}

/// Test: Manual paste after camera permission is denied
#[test]
fn test_manual_paste_workflow() {
    let phone = Keylink::in_memory().unwrap();
    phone.create_encryption_key().unwrap();
    let exported = phone.export_encryption_key().unwrap();

    let tablet = Keylink::in_memory().unwrap();
    tablet.report_encrypted_data_detected();
    let controller = tablet.controller();

    assert_eq!(controller.camera_permission_denied(), EntryMode::ManualPaste);

    // Typo: one character short
    let short = &exported.key_hex()[..63];
    let feedback = controller.submit_manual(short);
    assert_eq!(feedback, ImportFeedback::InvalidLength { actual: 63 });
    assert!(tablet.is_new_device());

    // Typo: a character outside the hex alphabet
    let bad = format!("{}o", &exported.key_hex()[..63]);
    assert_eq!(
        controller.submit_manual(&bad),
        ImportFeedback::InvalidCharacters
    );

    // Pasted with surrounding whitespace and in upper case
    let pasted = format!("  {}\n", exported.key_hex().to_uppercase());
    assert!(controller.submit_manual(&pasted).is_success());
    assert!(!tablet.is_new_device());
}

/// Test: Dismissing the prompt shows a banner-free app until re-prompted
#[test]
fn test_dismissed_prompt_workflow() {
    let tablet = Keylink::in_memory().unwrap();
    tablet.report_encrypted_data_detected();
    let controller = tablet.controller();

    assert_eq!(controller.prompt(), LinkPrompt::Dialog);
    controller.dialog_presented();
    assert_eq!(controller.prompt(), LinkPrompt::Banner);

    controller.dismiss().unwrap();
    assert_eq!(controller.prompt(), LinkPrompt::None);
    assert_eq!(tablet.link_state().phase(), LinkPhase::DismissedUnlinked);

    // More unreadable data does not bring the prompt back
    tablet.report_encrypted_data_detected();
    assert_eq!(controller.prompt(), LinkPrompt::None);

    tablet.request_link_prompt().unwrap();
    assert_eq!(controller.prompt(), LinkPrompt::Dialog);
}

/// Test: Two devices holding the same key show the same fingerprint
#[test]
fn test_fingerprints_match_across_devices() {
    let phone = Keylink::in_memory().unwrap();
    phone.create_encryption_key().unwrap();
    let tablet = Keylink::in_memory().unwrap();

    let exported = phone.export_encryption_key().unwrap();
    tablet.import_encryption_key(exported.key_hex()).unwrap();

    assert_eq!(
        phone.export_encryption_key().unwrap().fingerprint(),
        tablet.export_encryption_key().unwrap().fingerprint()
    );
}
