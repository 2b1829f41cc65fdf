// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Link Controller
//!
//! Screen-independent logic behind the link prompt and the import screen:
//! when to prompt, which entry mode to offer, and how to report an import
//! result. Screens render what the controller returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::{InvalidFormat, LinkError};
use super::protocol::{ImportOutcome, KeyTransfer};
use super::qr::ScanSession;
use super::state::LinkState;
use crate::crypto::Fingerprint;

/// What the UI should show about linking right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkPrompt {
    /// Nothing to show.
    None,
    /// Show the blocking "link this device" dialog.
    Dialog,
    /// The dialog was already shown this session; show a persistent banner.
    Banner,
}

/// How the user enters the key on the import screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryMode {
    Scan,
    ManualPaste,
}

/// User-facing result of an import attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportFeedback {
    /// The key is active on this device.
    Linked {
        fingerprint: Fingerprint,
        /// Present when the key could only be stored in fallback storage.
        degraded_warning: Option<String>,
    },
    InvalidLength { actual: usize },
    InvalidCharacters,
    NoKeyFound,
    StorageFailure { message: String },
    /// Another import is still running.
    Busy,
}

impl ImportFeedback {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportFeedback::Linked { .. })
    }

    /// Short message suitable for display.
    pub fn message(&self) -> String {
        match self {
            ImportFeedback::Linked {
                fingerprint,
                degraded_warning: None,
            } => format!("Device linked. Key fingerprint: {}", fingerprint),
            ImportFeedback::Linked {
                fingerprint,
                degraded_warning: Some(_),
            } => format!(
                "Device linked (key fingerprint {}), but the key is stored outside secure storage",
                fingerprint
            ),
            ImportFeedback::InvalidLength { actual } => format!(
                "The key must be exactly 64 characters long. You entered {}.",
                actual
            ),
            ImportFeedback::InvalidCharacters => {
                "The key may only contain the digits 0-9 and the letters a-f.".to_string()
            }
            ImportFeedback::NoKeyFound => "No key found in this code.".to_string(),
            ImportFeedback::StorageFailure { message } => {
                format!("The key could not be saved: {}", message)
            }
            ImportFeedback::Busy => "An import is already in progress.".to_string(),
        }
    }
}

impl From<Result<ImportOutcome, LinkError>> for ImportFeedback {
    fn from(result: Result<ImportOutcome, LinkError>) -> Self {
        match result {
            Ok(outcome) => ImportFeedback::Linked {
                fingerprint: outcome.fingerprint,
                degraded_warning: outcome.warning.map(|w| w.to_string()),
            },
            Err(LinkError::InvalidFormat(InvalidFormat::WrongLength { actual })) => {
                ImportFeedback::InvalidLength { actual }
            }
            Err(LinkError::InvalidFormat(InvalidFormat::NonHexCharacters)) => {
                ImportFeedback::InvalidCharacters
            }
            Err(LinkError::InvalidFormat(InvalidFormat::NoKeyFound)) => ImportFeedback::NoKeyFound,
            Err(LinkError::ImportInProgress) => ImportFeedback::Busy,
            Err(e) => ImportFeedback::StorageFailure {
                message: e.to_string(),
            },
        }
    }
}

/// Drives the link prompt and import screen.
pub struct LinkController {
    state: Arc<LinkState>,
    transfer: Arc<KeyTransfer>,
    dialog_presented: AtomicBool,
    manual_entry: AtomicBool,
}

impl LinkController {
    pub fn new(state: Arc<LinkState>, transfer: Arc<KeyTransfer>) -> Self {
        LinkController {
            state,
            transfer,
            dialog_presented: AtomicBool::new(false),
            manual_entry: AtomicBool::new(false),
        }
    }

    /// Decides what to show. The dialog appears at most once per session;
    /// after that an undismissed new device gets a banner.
    pub fn prompt(&self) -> LinkPrompt {
        if !self.state.is_new_device() {
            LinkPrompt::None
        } else if self.dialog_presented.load(Ordering::Acquire) {
            LinkPrompt::Banner
        } else {
            LinkPrompt::Dialog
        }
    }

    /// Records that the dialog was shown.
    pub fn dialog_presented(&self) {
        self.dialog_presented.store(true, Ordering::Release);
    }

    /// The user dismissed the prompt.
    pub fn dismiss(&self) -> Result<(), LinkError> {
        self.state.dismiss_dialog()?;
        Ok(())
    }

    /// The user asked to see the prompt again.
    pub fn reprompt(&self) -> Result<(), LinkError> {
        self.state.request_reprompt()?;
        self.dialog_presented.store(false, Ordering::Release);
        Ok(())
    }

    /// While true the import action must be disabled.
    pub fn is_import_in_flight(&self) -> bool {
        self.transfer.is_import_in_flight()
    }

    pub fn entry_mode(&self) -> EntryMode {
        if self.manual_entry.load(Ordering::Acquire) {
            EntryMode::ManualPaste
        } else {
            EntryMode::Scan
        }
    }

    pub fn set_entry_mode(&self, mode: EntryMode) {
        self.manual_entry
            .store(mode == EntryMode::ManualPaste, Ordering::Release);
    }

    /// Camera access was refused; switch to manual paste.
    pub fn camera_permission_denied(&self) -> EntryMode {
        tracing::info!("camera permission denied, switching to manual key entry");
        self.set_entry_mode(EntryMode::ManualPaste);
        EntryMode::ManualPaste
    }

    /// Imports a key typed or pasted by the user.
    pub fn submit_manual(&self, text: &str) -> ImportFeedback {
        self.transfer.import(text).into()
    }

    /// Handles one scanner callback.
    ///
    /// Returns `None` for frames without a key and for every frame after the
    /// session accepted one. A failed or rejected import re-arms the session.
    pub fn submit_scan(&self, session: &ScanSession, payload: &str) -> Option<ImportFeedback> {
        let key_hex = session.offer(payload)?;

        let feedback: ImportFeedback = self.transfer.import(&key_hex).into();
        if !feedback.is_success() {
            session.reset();
        }
        Some(feedback)
    }
}
