//! SQLite-backed key-value store.
//!
//! One row per key in the `kv_store` table. The file is opened in WAL mode
//! so a crash mid-write leaves the previous value readable.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use chatdesk_core::error::ChatdeskError;

use crate::kv::KeyValueStore;
use crate::migrations;

const SELECT_VALUE: &str = "SELECT value FROM kv_store WHERE key = ?1";
const UPSERT_VALUE: &str = "INSERT INTO kv_store (key, value, updated_at)
     VALUES (?1, ?2, strftime('%s', 'now'))
     ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at";
const DELETE_VALUE: &str = "DELETE FROM kv_store WHERE key = ?1";

/// Durable [`KeyValueStore`] in a single SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`, creating parent directories
    /// and applying pending migrations.
    pub fn open(path: &Path) -> Result<Self, ChatdeskError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| ChatdeskError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| ChatdeskError::Storage(format!("Failed to enable WAL: {}", e)))?;

        let store = Self::from_connection(conn)?;
        info!(path = %path.display(), "Key-value store opened");
        Ok(store)
    }

    /// A store that lives only as long as the value.
    pub fn in_memory() -> Result<Self, ChatdeskError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChatdeskError::Storage(format!("Failed to open in-memory store: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, ChatdeskError> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ChatdeskError> {
        self.conn
            .lock()
            .map_err(|e| ChatdeskError::Storage(format!("Store lock poisoned: {}", e)))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatdeskError> {
        self.conn()?
            .query_row(SELECT_VALUE, rusqlite::params![key], |row| row.get(0))
            .optional()
            .map_err(|e| ChatdeskError::Storage(format!("Failed to read key {}: {}", key, e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatdeskError> {
        self.conn()?
            .execute(UPSERT_VALUE, rusqlite::params![key, value])
            .map_err(|e| ChatdeskError::Storage(format!("Failed to write key {}: {}", key, e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ChatdeskError> {
        self.conn()?
            .execute(DELETE_VALUE, rusqlite::params![key])
            .map_err(|e| ChatdeskError::Storage(format!("Failed to remove key {}: {}", key, e)))?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish()
    }
}
