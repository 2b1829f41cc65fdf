// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key Transfer Protocol
//!
//! Moves the device key between installs as a 64-character hex string,
//! either shown as a QR code or copied by hand.
//!
//! Import flow:
//! 1. Claim the in-flight flag or fail with `ImportInProgress`
//! 2. Normalize (trim, lowercase) and validate the candidate
//! 3. Store it in the best available tier
//! 4. Commit the link state in one atomic write, rolling the vault back if
//!    that fails
//! 5. Broadcast one `KeyChanged`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use zeroize::Zeroize;

use super::error::{InvalidFormat, LinkError};
use super::qr::{extract_key_from_payload, render_qr};
use super::state::{KeyInfo, LinkState};
use crate::crypto::{EncryptionKey, Fingerprint, KEY_LENGTH};
use crate::storage::{DegradedStorageWarning, KeySource, KeyVault};

/// Length of a key in transfer form.
pub const KEY_HEX_LENGTH: usize = KEY_LENGTH * 2;

/// Trims surrounding whitespace and lowercases.
pub fn normalize_candidate(candidate: &str) -> String {
    candidate.trim().to_ascii_lowercase()
}

/// Validates and decodes a key in transfer form.
///
/// Length is checked before the character set, so a short paste reports
/// its length even if it also contains stray characters.
pub fn parse_key_hex(candidate: &str) -> Result<EncryptionKey, InvalidFormat> {
    let mut normalized = normalize_candidate(candidate);
    let result = decode_normalized(&normalized);
    normalized.zeroize();
    result
}

fn decode_normalized(normalized: &str) -> Result<EncryptionKey, InvalidFormat> {
    let actual = normalized.chars().count();
    if actual != KEY_HEX_LENGTH {
        return Err(InvalidFormat::WrongLength { actual });
    }
    if !normalized
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(InvalidFormat::NonHexCharacters);
    }

    let mut bytes = [0u8; KEY_LENGTH];
    hex::decode_to_slice(normalized, &mut bytes).map_err(|_| InvalidFormat::NonHexCharacters)?;
    let key = EncryptionKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}

/// The key in transfer form, ready to show or copy.
pub struct ExportedKey {
    key_hex: String,
    fingerprint: Fingerprint,
}

impl ExportedKey {
    fn new(key: &EncryptionKey) -> Self {
        ExportedKey {
            key_hex: key.to_hex(),
            fingerprint: Fingerprint::of(key),
        }
    }

    /// The 64 lowercase hex characters to transfer.
    pub fn key_hex(&self) -> &str {
        &self.key_hex
    }

    /// Fingerprint for the user to compare on both devices.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Renders the key as a QR code string.
    pub fn to_qr_image_string(&self) -> String {
        render_qr(&self.key_hex)
    }
}

impl std::fmt::Debug for ExportedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedKey")
            .field("key_hex", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl Drop for ExportedKey {
    fn drop(&mut self) {
        self.key_hex.zeroize();
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub fingerprint: Fingerprint,
    pub source: KeySource,
    /// Set when the key only reached the fallback tier.
    pub warning: Option<DegradedStorageWarning>,
    /// False when the candidate was already the active key.
    pub replaced: bool,
}

/// Clears the in-flight flag when the import finishes, including on panic.
pub(super) struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    pub(super) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Export and import of the device key.
///
/// Every import path goes through [`KeyTransfer::import`], which admits one
/// import at a time.
pub struct KeyTransfer {
    vault: Arc<KeyVault>,
    state: Arc<LinkState>,
    pub(super) import_in_flight: AtomicBool,
}

impl KeyTransfer {
    pub fn new(vault: Arc<KeyVault>, state: Arc<LinkState>) -> Self {
        KeyTransfer {
            vault,
            state,
            import_in_flight: AtomicBool::new(false),
        }
    }

    /// True while an import is running.
    pub fn is_import_in_flight(&self) -> bool {
        self.import_in_flight.load(Ordering::Acquire)
    }

    /// Returns the active key in transfer form. The vault is not modified.
    pub fn export(&self) -> Result<ExportedKey, LinkError> {
        let stored = self.vault.get()?.ok_or(LinkError::NoKey)?;
        let exported = ExportedKey::new(&stored.key);

        tracing::info!(fingerprint = %exported.fingerprint, "exported device key");
        Ok(exported)
    }

    /// Imports a key in transfer form, replacing the active key.
    ///
    /// Fails with [`LinkError::ImportInProgress`] while another import runs.
    pub fn import(&self, candidate: &str) -> Result<ImportOutcome, LinkError> {
        let Some(_guard) = InFlightGuard::acquire(&self.import_in_flight) else {
            tracing::debug!("import rejected, another import is running");
            return Err(LinkError::ImportInProgress);
        };
        self.import_exclusive(candidate)
    }

    fn import_exclusive(&self, candidate: &str) -> Result<ImportOutcome, LinkError> {
        let key = parse_key_hex(candidate)?;
        let fingerprint = Fingerprint::of(&key);

        let previous = match self.vault.get() {
            Ok(previous) => previous,
            Err(e) => {
                // An unreadable key is about to be replaced anyway
                tracing::warn!(error = %e, "current key unreadable, importing over it");
                None
            }
        };

        // An ephemeral copy of the same key still needs persisting
        if let Some(current) = previous
            .as_ref()
            .filter(|p| p.key == key && p.source != KeySource::Ephemeral)
        {
            self.state.dismiss_dialog()?;
            tracing::debug!(fingerprint = %fingerprint, "imported key is already active");
            return Ok(ImportOutcome {
                fingerprint,
                source: current.source,
                warning: None,
                replaced: false,
            });
        }

        let stored = self.vault.store_preferred(&key)?;
        let info = KeyInfo {
            fingerprint: fingerprint.clone(),
            source: stored.source,
        };

        if let Err(e) = self.state.commit_key(info, true) {
            tracing::warn!(error = %e, "link state commit failed, rolling back key");
            if let Err(rollback) = self.vault.restore(previous) {
                tracing::warn!(error = %rollback, "key rollback failed");
            }
            return Err(e.into());
        }

        Ok(ImportOutcome {
            fingerprint,
            source: stored.source,
            warning: stored.warning,
            replaced: true,
        })
    }

    /// Imports the key contained in a scanned QR payload.
    pub fn import_scanned(&self, payload: &str) -> Result<ImportOutcome, LinkError> {
        let mut key_hex = extract_key_from_payload(payload).ok_or(InvalidFormat::NoKeyFound)?;
        let result = self.import(&key_hex);
        key_hex.zeroize();
        result
    }
}
