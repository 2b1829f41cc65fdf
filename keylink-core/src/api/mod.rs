// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keylink API Layer
//!
//! High-level API for the device key lifecycle and cross-device linking.
//!
//! # Overview
//!
//! The API layer coordinates:
//! - Key creation, export, import and wipe
//! - The link state and the link prompt
//! - The device id
//! - Event delivery between the data layer and the UI
//!
//! # Example
//!
//! ```ignore
//! use keylink_core::api::{Keylink, KeylinkConfig};
//!
//! let keylink = Keylink::new(KeylinkConfig::with_data_dir("./data"))?;
//!
//! // The data layer reports a record it cannot decrypt
//! keylink.report_encrypted_data_detected();
//!
//! if keylink.is_new_device() {
//!     let outcome = keylink.import_encryption_key(&pasted)?;
//!     println!("Linked, fingerprint {}", outcome.fingerprint);
//! }
//! ```
//!
//! # Module Structure
//!
//! - `error` - Error types for the API layer
//! - `config` - Configuration types
//! - [`events`] - Event bus
//! - `keylink` - Main Keylink orchestrator

mod config;
mod error;
pub mod events;
mod keylink;

// Error types
pub use error::{KeylinkError, KeylinkResult};

// Configuration
pub use config::KeylinkConfig;

// Events
pub use events::{
    CallbackHandler, EventBus, EventHandler, LinkEvent, LinkEventKind, SubscriptionId,
};

// Keylink
pub use keylink::{CreatedKey, Keylink, KeylinkBuilder};
