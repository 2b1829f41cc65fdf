// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Schema Migrations
//!
//! The preference database carries a `schema_version` table. Pending
//! migrations run in version order inside one transaction; a failure leaves
//! the schema at its previous version.

use rusqlite::{params, Connection};

use super::StorageError;

/// One schema step.
pub struct Migration {
    /// Starts at 1 and increases by one per step.
    pub version: u32,
    pub name: &'static str,
    /// SQL executed as one batch.
    pub sql: &'static str,
}

/// Applies [`Migration`]s to a connection.
pub struct MigrationRunner;

impl MigrationRunner {
    /// Brings the schema up to the newest version in `migrations`.
    pub fn run(conn: &Connection, migrations: &[Migration]) -> Result<(), StorageError> {
        if let Some(pair) = migrations
            .windows(2)
            .find(|pair| pair[0].version >= pair[1].version)
        {
            return Err(StorageError::Migration(format!(
                "v{} is listed before v{}",
                pair[0].version, pair[1].version
            )));
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );",
        )?;

        let from = Self::current_version(conn)?;
        let mut pending = migrations.iter().filter(|m| m.version > from).peekable();
        if pending.peek().is_none() {
            return Ok(());
        }

        // Dropping the transaction on an early return rolls it back
        let tx = conn.unchecked_transaction()?;
        for migration in pending {
            tx.execute_batch(migration.sql).map_err(|e| {
                StorageError::Migration(format!("v{} '{}': {}", migration.version, migration.name, e))
            })?;
            tx.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                params![migration.version, super::unix_now()],
            )?;
            tracing::debug!(version = migration.version, name = migration.name, "schema migrated");
        }
        tx.commit()?;

        Ok(())
    }

    /// Returns the applied schema version; 0 for a fresh database.
    pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
        let tracked: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        if tracked == 0 {
            return Ok(0);
        }

        let version: Option<u32> =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
        Ok(version.unwrap_or_default())
    }
}

/// Every migration, oldest first. Append new steps at the end.
pub fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        name: "link_preferences",
        sql: "CREATE TABLE IF NOT EXISTS link_preferences (
                  key TEXT PRIMARY KEY,
                  value TEXT NOT NULL,
                  updated_at INTEGER NOT NULL
              );",
    }]
}
