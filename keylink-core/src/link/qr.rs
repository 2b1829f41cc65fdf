// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! QR Transfer
//!
//! Rendering an exported key as a QR code, and pulling a key back out of a
//! scanned payload. Scanners deliver the same payload many times per
//! second; [`ScanSession`] makes sure only the first valid one is used.

use std::sync::atomic::{AtomicBool, Ordering};

use super::protocol::KEY_HEX_LENGTH;

/// Finds the key in a scanned payload.
///
/// The key is the first maximal run of exactly 64 hex digits, so payloads
/// wrapped in a URL or label still work. Returns the run lowercased.
pub fn extract_key_from_payload(payload: &str) -> Option<String> {
    let bytes = payload.as_bytes();
    let mut start = 0;

    while start < bytes.len() {
        if !bytes[start].is_ascii_hexdigit() {
            start += 1;
            continue;
        }

        let run = bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if run == KEY_HEX_LENGTH {
            return Some(payload[start..start + run].to_ascii_lowercase());
        }
        start += run;
    }

    None
}

/// Renders data as a block-character QR code for terminals and debug output.
pub(crate) fn render_qr(data: &str) -> String {
    use qrcode::QrCode;

    let code = QrCode::new(data).expect("QR generation should not fail");

    code.render()
        .light_color(' ')
        .dark_color('█')
        .quiet_zone(false)
        .build()
}

/// One scanning session of the camera screen.
///
/// Locks after the first payload containing a key; later frames are
/// ignored until [`ScanSession::reset`].
#[derive(Debug, Default)]
pub struct ScanSession {
    locked: AtomicBool,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a scanned payload. Returns the key hex for the first payload
    /// that contains one, `None` for everything else.
    pub fn offer(&self, payload: &str) -> Option<String> {
        if self.is_locked() {
            return None;
        }

        let key_hex = extract_key_from_payload(payload)?;
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| key_hex)
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Re-arms the session, e.g. after a failed import.
    pub fn reset(&self) {
        self.locked.store(false, Ordering::Release);
    }
}
