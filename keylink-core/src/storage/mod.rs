// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! Key storage tiers, the key vault, and the SQLite-backed preference store
//! holding the link subsystem's durable records.

mod error;
pub mod migration;
pub mod preferences;
pub mod secure;
pub mod vault;

pub use error::StorageError;
pub use preferences::{
    flag_value, MemoryPreferences, PreferenceChange, PreferenceKey, Preferences,
};
pub use secure::{FileKeyStorage, MemoryKeyStorage, SecureStorage, UnavailableKeyStorage};
pub use vault::{DegradedStorageWarning, KeySource, KeyVault, StorageTier, StoreOutcome, StoredKey};

#[cfg(feature = "secure-storage")]
pub use secure::PlatformKeyring;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// SQLite-based preference storage.
///
/// The connection is guarded so the store can be shared with event handlers.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Storage {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Creates an in-memory storage (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Storage {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Runs all pending schema migrations.
    fn run_migrations(&self) -> Result<(), StorageError> {
        let migrations = migration::all_migrations();
        migration::MigrationRunner::run(&self.conn.lock(), &migrations)
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn.lock())
    }
}

impl Preferences for Storage {
    fn get(&self, key: PreferenceKey) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM link_preferences WHERE key = ?1",
                params![key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn apply(&self, changes: &[PreferenceChange]) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let now = unix_now();

        for (key, value) in changes {
            match value {
                Some(value) => {
                    tx.execute(
                        "INSERT INTO link_preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                        params![key.as_str(), value, now],
                    )?;
                }
                None => {
                    tx.execute(
                        "DELETE FROM link_preferences WHERE key = ?1",
                        params![key.as_str()],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}
