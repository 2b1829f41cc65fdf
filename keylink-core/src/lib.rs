// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keylink Core Library
//!
//! Device encryption key lifecycle and cross-device linking.
//! All cryptographic operations use the audited `ring` crate.

pub mod api;
pub mod crypto;
pub mod identity;
pub mod link;
pub mod storage;

pub use api::{
    CreatedKey, EventBus, Keylink, KeylinkBuilder, KeylinkConfig, KeylinkError, KeylinkResult,
    LinkEvent, LinkEventKind,
};
pub use crypto::{fingerprint, EncryptionKey, Fingerprint, KeyError};
pub use identity::{DeviceId, DeviceIdentity, PlatformAttributes, PlatformIdentity};
pub use link::{
    EntryMode, ExportedKey, ImportFeedback, ImportOutcome, InvalidFormat, KeyInfo, KeyTransfer,
    LinkController, LinkError, LinkPhase, LinkPrompt, LinkSnapshot, LinkState, ScanSession,
};
pub use storage::{
    DegradedStorageWarning, KeySource, KeyVault, SecureStorage, Storage, StorageError,
};
