// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the Keylink API layer.

use thiserror::Error;

use crate::crypto::KeyError;
use crate::link::{InvalidFormat, LinkError};
use crate::storage::StorageError;

/// Unified error type for Keylink operations.
#[derive(Error, Debug)]
pub enum KeylinkError {
    /// Export, import or key creation failed.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Raw key material was malformed.
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<InvalidFormat> for KeylinkError {
    fn from(err: InvalidFormat) -> Self {
        KeylinkError::Link(LinkError::InvalidFormat(err))
    }
}

/// Result type for Keylink operations.
pub type KeylinkResult<T> = Result<T, KeylinkError>;
