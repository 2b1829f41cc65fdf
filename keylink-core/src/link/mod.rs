// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Linking Module
//!
//! Moving the device key to a second install and tracking whether this
//! install still needs it.

pub mod controller;
mod error;
pub mod protocol;
pub mod qr;
pub mod state;

pub use controller::{EntryMode, ImportFeedback, LinkController, LinkPrompt};
pub use error::{InvalidFormat, LinkError};
pub use protocol::{
    normalize_candidate, parse_key_hex, ExportedKey, ImportOutcome, KeyTransfer, KEY_HEX_LENGTH,
};
pub use qr::{extract_key_from_payload, ScanSession};
pub use state::{KeyInfo, LinkPhase, LinkSnapshot, LinkState};
