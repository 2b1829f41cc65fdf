// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod fingerprint;
pub mod key;

pub use fingerprint::{fingerprint, Fingerprint, FINGERPRINT_BYTES};
pub use key::{EncryptionKey, KeyError, KEY_LENGTH};
