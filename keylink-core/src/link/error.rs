// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Link Error Types

use thiserror::Error;

use crate::storage::StorageError;

/// Why an import candidate is not a key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidFormat {
    #[error("Key must be 64 hex characters, got {actual}")]
    WrongLength { actual: usize },

    #[error("Key may only contain the characters 0-9 and a-f")]
    NonHexCharacters,

    #[error("No key found in scanned code")]
    NoKeyFound,
}

/// Errors from exporting, importing or creating the device key.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("No encryption key on this device")]
    NoKey,

    #[error("Invalid key format: {0}")]
    InvalidFormat(#[from] InvalidFormat),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("An encryption key already exists on this device")]
    KeyAlreadyExists,

    #[error("A key import is already in progress")]
    ImportInProgress,
}

impl LinkError {
    /// True when the user can simply correct the input and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LinkError::InvalidFormat(_) | LinkError::ImportInProgress
        )
    }
}
