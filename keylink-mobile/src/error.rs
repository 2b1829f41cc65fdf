// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mobile-friendly error types.

use keylink_core::{InvalidFormat, KeyError, KeylinkError, LinkError, StorageError};

/// Mobile-friendly error type.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MobileError {
    #[error("No encryption key on this device")]
    NoKey,

    #[error("Key must be 64 characters, got {actual}")]
    InvalidKeyLength { actual: u32 },

    #[error("Key may only contain the characters 0-9 and a-f")]
    InvalidKeyCharacters,

    #[error("No key found in scanned code")]
    NoKeyFound,

    #[error("An encryption key already exists on this device")]
    KeyAlreadyExists,

    #[error("A key import is already in progress")]
    ImportInProgress,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<StorageError> for MobileError {
    fn from(err: StorageError) -> Self {
        MobileError::StorageError(err.to_string())
    }
}

impl From<InvalidFormat> for MobileError {
    fn from(err: InvalidFormat) -> Self {
        match err {
            InvalidFormat::WrongLength { actual } => MobileError::InvalidKeyLength {
                actual: u32::try_from(actual).unwrap_or(u32::MAX),
            },
            InvalidFormat::NonHexCharacters => MobileError::InvalidKeyCharacters,
            InvalidFormat::NoKeyFound => MobileError::NoKeyFound,
        }
    }
}

impl From<LinkError> for MobileError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::NoKey => MobileError::NoKey,
            LinkError::InvalidFormat(e) => e.into(),
            LinkError::Storage(e) => e.into(),
            LinkError::KeyAlreadyExists => MobileError::KeyAlreadyExists,
            LinkError::ImportInProgress => MobileError::ImportInProgress,
        }
    }
}

impl From<KeyError> for MobileError {
    fn from(err: KeyError) -> Self {
        MobileError::InvalidInput(err.to_string())
    }
}

impl From<KeylinkError> for MobileError {
    fn from(err: KeylinkError) -> Self {
        match err {
            KeylinkError::Link(e) => e.into(),
            KeylinkError::Storage(e) => e.into(),
            KeylinkError::Key(e) => e.into(),
            KeylinkError::Configuration(msg) => MobileError::Configuration(msg),
        }
    }
}
