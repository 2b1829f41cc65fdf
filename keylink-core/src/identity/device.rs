// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Identity
//!
//! A stable per-install identifier used for diagnostics and detection
//! heuristics. Never used as key material.

use std::sync::Arc;

use parking_lot::Mutex;
use ring::digest::{Context, SHA256};
use serde::{Deserialize, Serialize};

use crate::storage::{PreferenceKey, Preferences, StorageError};

/// Domain separation label for device id hashing.
const DEVICE_ID_INFO: &[u8] = b"Keylink_Device_ID";

/// Number of digest bytes kept in a device id.
const DEVICE_ID_BYTES: usize = 16;

/// Raw platform attributes. Any of them may be unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAttributes {
    /// Per-install identifier issued by the OS or app store.
    pub install_id: Option<String>,
    /// Hardware model, e.g. "iPhone15,2".
    pub device_model: Option<String>,
    /// OS name and version, e.g. "iOS 17.4".
    pub os_version: Option<String>,
}

impl PlatformAttributes {
    /// Drops blank attributes and trims the rest.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        PlatformAttributes {
            install_id: clean(&self.install_id),
            device_model: clean(&self.device_model),
            os_version: clean(&self.os_version),
        }
    }
}

/// Supplies platform attributes to [`DeviceIdentity`].
pub trait PlatformIdentity: Send + Sync {
    fn attributes(&self) -> PlatformAttributes;
}

/// Fixed attributes, for platforms that read them once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticPlatformIdentity(pub PlatformAttributes);

impl PlatformIdentity for StaticPlatformIdentity {
    fn attributes(&self) -> PlatformAttributes {
        self.0.clone()
    }
}

/// Opaque per-install identifier (32 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured record hashed into a device id.
#[derive(Serialize)]
struct IdentityRecord<'a> {
    install_id: Option<&'a str>,
    device_model: Option<&'a str>,
    os_version: Option<&'a str>,
    nonce: Option<String>,
}

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives a device id from platform attributes.
    ///
    /// Without an install id the attributes are not unique per install, so a
    /// random nonce is mixed in.
    pub fn derive(attributes: &PlatformAttributes) -> Result<Self, StorageError> {
        let attrs = attributes.normalized();
        let record = IdentityRecord {
            install_id: attrs.install_id.as_deref(),
            device_model: attrs.device_model.as_deref(),
            os_version: attrs.os_version.as_deref(),
            nonce: attrs
                .install_id
                .is_none()
                .then(|| uuid::Uuid::new_v4().to_string()),
        };

        let encoded =
            serde_json::to_vec(&record).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut ctx = Context::new(&SHA256);
        ctx.update(DEVICE_ID_INFO);
        ctx.update(&encoded);
        let digest = ctx.finish();

        Ok(DeviceId(hex::encode(&digest.as_ref()[..DEVICE_ID_BYTES])))
    }
}

/// Produces and persists the device id.
pub struct DeviceIdentity {
    prefs: Arc<dyn Preferences>,
    platform: Arc<dyn PlatformIdentity>,
    cached: Mutex<Option<DeviceId>>,
}

impl DeviceIdentity {
    pub fn new(prefs: Arc<dyn Preferences>, platform: Arc<dyn PlatformIdentity>) -> Self {
        DeviceIdentity {
            prefs,
            platform,
            cached: Mutex::new(None),
        }
    }

    /// Returns the persisted device id, creating it on first call.
    pub fn get_or_create(&self) -> Result<DeviceId, StorageError> {
        let mut cached = self.cached.lock();
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let id = match self.prefs.get(PreferenceKey::DeviceId)? {
            Some(stored) => DeviceId(stored),
            None => {
                let id = DeviceId::derive(&self.platform.attributes())?;
                self.prefs.set(PreferenceKey::DeviceId, id.as_str())?;
                tracing::info!(device_id = %id, "created device id");
                id
            }
        };

        *cached = Some(id.clone());
        Ok(id)
    }
}
