// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use proptest::prelude::*;

// ============================================================
// Key Strategies
// ============================================================

/// Strategy for generating raw 32-byte keys.
pub fn key_bytes_strategy() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Strategy for generating valid transfer-form keys in either case.
pub fn key_hex_strategy() -> impl Strategy<Value = String> {
    "[0-9a-fA-F]{64}"
}

/// Strategy for generating hex strings of any length except 64.
pub fn wrong_length_hex_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[0-9a-f]{0,63}", "[0-9a-f]{65,100}"]
}

/// Strategy for generating 64-character strings with at least one non-hex character.
pub fn non_hex_candidate_strategy() -> impl Strategy<Value = String> {
    ("[0-9a-f]{63}", "[g-zG-Z!@#%&*]", 0usize..64).prop_map(|(hex, bad, pos)| {
        let mut s = hex;
        s.insert_str(pos, &bad);
        s
    })
}

/// Strategy for generating arbitrary strings that are not a valid key after
/// trimming and lowercasing.
pub fn invalid_candidate_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        wrong_length_hex_strategy(),
        non_hex_candidate_strategy(),
        ".{0,100}",
    ]
    .prop_filter("must not be a valid key", |s| {
        let normalized = s.trim().to_ascii_lowercase();
        !(normalized.len() == 64 && normalized.bytes().all(|b| b.is_ascii_hexdigit()))
    })
}

// ============================================================
// Link State Strategies
// ============================================================

/// Strategy for generating `(has_key, encrypted_data_detected, dialog_dismissed)`.
pub fn link_flags_strategy() -> impl Strategy<Value = (bool, bool, bool)> {
    (any::<bool>(), any::<bool>(), any::<bool>())
}
