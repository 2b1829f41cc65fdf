// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mobile-friendly data types.
//!
//! These types are wrappers around keylink-core types that are compatible
//! with UniFFI for cross-language bindings.

use keylink_core::link::ImportOutcome;
use keylink_core::{
    CreatedKey, EntryMode, ExportedKey, ImportFeedback, KeySource, LinkPhase, LinkPrompt,
    LinkSnapshot,
};

/// Where the active key is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MobileKeySource {
    SecureTier,
    FallbackTier,
    Ephemeral,
}

impl From<KeySource> for MobileKeySource {
    fn from(source: KeySource) -> Self {
        match source {
            KeySource::SecureTier => MobileKeySource::SecureTier,
            KeySource::FallbackTier => MobileKeySource::FallbackTier,
            KeySource::Ephemeral => MobileKeySource::Ephemeral,
        }
    }
}

/// Named link phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MobileLinkPhase {
    Unlinked,
    NewDeviceFlagged,
    DismissedUnlinked,
    Linked,
}

impl From<LinkPhase> for MobileLinkPhase {
    fn from(phase: LinkPhase) -> Self {
        match phase {
            LinkPhase::Unlinked => MobileLinkPhase::Unlinked,
            LinkPhase::NewDeviceFlagged => MobileLinkPhase::NewDeviceFlagged,
            LinkPhase::DismissedUnlinked => MobileLinkPhase::DismissedUnlinked,
            LinkPhase::Linked => MobileLinkPhase::Linked,
        }
    }
}

/// Mobile-friendly link state.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MobileLinkState {
    pub has_key: bool,
    pub fingerprint: Option<String>,
    pub key_source: Option<MobileKeySource>,
    pub encrypted_data_detected: bool,
    pub dialog_dismissed: bool,
    pub is_new_device: bool,
    pub phase: MobileLinkPhase,
}

impl From<&LinkSnapshot> for MobileLinkState {
    fn from(snapshot: &LinkSnapshot) -> Self {
        MobileLinkState {
            has_key: snapshot.has_key(),
            fingerprint: snapshot.fingerprint().map(|f| f.to_string()),
            key_source: snapshot.key_source().map(Into::into),
            encrypted_data_detected: snapshot.encrypted_data_detected(),
            dialog_dismissed: snapshot.dialog_dismissed(),
            is_new_device: snapshot.is_new_device(),
            phase: snapshot.phase().into(),
        }
    }
}

/// The key in transfer form.
#[derive(Clone, uniffi::Record)]
pub struct MobileExportedKey {
    /// 64 lowercase hex characters; encode as the QR payload.
    pub key_hex: String,
    pub fingerprint: String,
}

impl std::fmt::Debug for MobileExportedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MobileExportedKey")
            .field("key_hex", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl From<&ExportedKey> for MobileExportedKey {
    fn from(exported: &ExportedKey) -> Self {
        MobileExportedKey {
            key_hex: exported.key_hex().to_string(),
            fingerprint: exported.fingerprint().to_string(),
        }
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MobileImportResult {
    pub fingerprint: String,
    pub source: MobileKeySource,
    /// Set when the key could only be stored outside secure storage.
    pub degraded_warning: Option<String>,
    /// False when the key was already active.
    pub replaced: bool,
}

impl From<ImportOutcome> for MobileImportResult {
    fn from(outcome: ImportOutcome) -> Self {
        MobileImportResult {
            fingerprint: outcome.fingerprint.to_string(),
            source: outcome.source.into(),
            degraded_warning: outcome.warning.map(|w| w.to_string()),
            replaced: outcome.replaced,
        }
    }
}

/// A key created on this device.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MobileCreatedKey {
    pub fingerprint: String,
    pub source: MobileKeySource,
    pub degraded_warning: Option<String>,
}

impl From<CreatedKey> for MobileCreatedKey {
    fn from(created: CreatedKey) -> Self {
        MobileCreatedKey {
            fingerprint: created.fingerprint.to_string(),
            source: created.source.into(),
            degraded_warning: created.warning.map(|w| w.to_string()),
        }
    }
}

/// What the app should show about linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MobileLinkPrompt {
    None,
    Dialog,
    Banner,
}

impl From<LinkPrompt> for MobileLinkPrompt {
    fn from(prompt: LinkPrompt) -> Self {
        match prompt {
            LinkPrompt::None => MobileLinkPrompt::None,
            LinkPrompt::Dialog => MobileLinkPrompt::Dialog,
            LinkPrompt::Banner => MobileLinkPrompt::Banner,
        }
    }
}

/// Key entry mode on the import screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MobileEntryMode {
    Scan,
    ManualPaste,
}

impl From<EntryMode> for MobileEntryMode {
    fn from(mode: EntryMode) -> Self {
        match mode {
            EntryMode::Scan => MobileEntryMode::Scan,
            EntryMode::ManualPaste => MobileEntryMode::ManualPaste,
        }
    }
}

impl From<MobileEntryMode> for EntryMode {
    fn from(mode: MobileEntryMode) -> Self {
        match mode {
            MobileEntryMode::Scan => EntryMode::Scan,
            MobileEntryMode::ManualPaste => EntryMode::ManualPaste,
        }
    }
}

/// Kind of import feedback, for choosing how to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MobileImportStatus {
    Linked,
    InvalidLength,
    InvalidCharacters,
    NoKeyFound,
    StorageFailure,
    Busy,
}

/// Import feedback ready for display.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MobileImportFeedback {
    pub status: MobileImportStatus,
    /// Localizable fallback message.
    pub message: String,
    /// Fingerprint of the linked key, when `status` is `Linked`.
    pub fingerprint: Option<String>,
    /// Set when the key was linked but stored outside secure storage.
    pub degraded_warning: Option<String>,
}

impl From<ImportFeedback> for MobileImportFeedback {
    fn from(feedback: ImportFeedback) -> Self {
        let message = feedback.message();
        let (status, fingerprint, degraded_warning) = match feedback {
            ImportFeedback::Linked {
                fingerprint,
                degraded_warning,
            } => (
                MobileImportStatus::Linked,
                Some(fingerprint.to_string()),
                degraded_warning,
            ),
            ImportFeedback::InvalidLength { .. } => (MobileImportStatus::InvalidLength, None, None),
            ImportFeedback::InvalidCharacters => {
                (MobileImportStatus::InvalidCharacters, None, None)
            }
            ImportFeedback::NoKeyFound => (MobileImportStatus::NoKeyFound, None, None),
            ImportFeedback::StorageFailure { .. } => {
                (MobileImportStatus::StorageFailure, None, None)
            }
            ImportFeedback::Busy => (MobileImportStatus::Busy, None, None),
        };

        MobileImportFeedback {
            status,
            message,
            fingerprint,
            degraded_warning,
        }
    }
}
