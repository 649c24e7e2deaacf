//! Durable key-value storage behind a capability trait.
//!
//! The random source persists its entropy cache through this interface. The
//! adapter is injected at construction; when no durable backing is supplied
//! the [`NullStorage`] no-op keeps everything in-memory-only.

use anyhow::{Context, Result};
use log::warn;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// String key-value storage. Implementations must be cheap enough to call on
/// every cache consumption.
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Default no-op adapter: reads find nothing, writes go nowhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStorage;

impl KeyValueStorage for NullStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn remove_item(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

/// In-memory adapter, mostly for tests and single-run sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().expect("storage mutex poisoned");
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().expect("storage mutex poisoned");
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().expect("storage mutex poisoned");
        items.remove(key);
        Ok(())
    }
}

/// SQLite-backed adapter: one `kv` table, keyed by string.
///
/// The connection lives behind a mutex; every operation is a single
/// statement so contention is negligible at this call rate.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the backing database and ensure the `kv` table.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open storage database at {}", path.display()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            (),
        )
        .context("Failed to create kv table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("Failed to read storage key `{key}'"))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )
        .with_context(|| format!("Failed to write storage key `{key}'"))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])
            .with_context(|| format!("Failed to delete storage key `{key}'"))?;
        Ok(())
    }
}

/// Best-effort write used on hot paths: storage failures are logged, never
/// propagated, because losing the persisted cache only costs entropy quality.
pub(crate) fn persist_best_effort(storage: &dyn KeyValueStorage, key: &str, value: &str) {
    if let Err(e) = storage.set_item(key, value) {
        warn!("Failed to persist `{key}': {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn KeyValueStorage) {
        assert_eq!(storage.get_item("missing").unwrap(), None);

        storage.set_item("cache", "abc123").unwrap();
        assert_eq!(storage.get_item("cache").unwrap().as_deref(), Some("abc123"));

        storage.set_item("cache", "def").unwrap();
        assert_eq!(storage.get_item("cache").unwrap().as_deref(), Some("def"));

        storage.remove_item("cache").unwrap();
        assert_eq!(storage.get_item("cache").unwrap(), None);

        // Removing a missing key is fine.
        storage.remove_item("cache").unwrap();
    }

    #[test]
    fn null_storage_is_a_black_hole() {
        let storage = NullStorage;
        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.remove_item("k").unwrap();
    }

    #[test]
    fn memory_storage_round_trip() {
        exercise(&MemoryStorage::new());
    }

    #[test]
    fn sqlite_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(&dir.path().join("kv.db")).unwrap();
        exercise(&storage);
    }

    #[test]
    fn sqlite_storage_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");

        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.set_item("cache", "feedface").unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(
            storage.get_item("cache").unwrap().as_deref(),
            Some("feedface")
        );
    }
}
