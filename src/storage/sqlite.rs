use std::path::Path;
use std::rc::Rc;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::KeyValueStorage;
use crate::error::StorageError;

/// SQLite-backed key-value storage.
/// All operations are synchronous (rusqlite is blocking).
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    conn: Rc<Connection>,
}

impl SqliteStorage {
    /// Create or open the database at `db_path`.
    pub fn new(db_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::init(conn, &format!("{:?}", db_path))
    }

    /// An in-memory database that lives as long as the last clone.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?, ":memory:")
    }

    fn init(conn: Connection, label: &str) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;

        info!("Opened SQLite storage at {}", label);
        Ok(Self {
            conn: Rc::new(conn),
        })
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (SqliteStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(&dir.path().join("storage.db")).unwrap();
        (storage, dir)
    }

    #[test]
    fn test_set_and_get() {
        let (storage, _dir) = create_test_storage();

        storage.set_item("m3dp-active-profile", "123-abc").unwrap();
        assert_eq!(
            storage.get_item("m3dp-active-profile").unwrap().as_deref(),
            Some("123-abc")
        );
    }

    #[test]
    fn test_get_missing() {
        let (storage, _dir) = create_test_storage();
        assert!(storage.get_item("missing").unwrap().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let (storage, _dir) = create_test_storage();

        storage.set_item("m3dp-last-page", "home").unwrap();
        storage.set_item("m3dp-last-page", "flow").unwrap();
        assert_eq!(
            storage.get_item("m3dp-last-page").unwrap().as_deref(),
            Some("flow")
        );
    }

    #[test]
    fn test_remove() {
        let (storage, _dir) = create_test_storage();

        storage.set_item("k", "v").unwrap();
        storage.remove_item("k").unwrap();
        storage.remove_item("k").unwrap();
        assert!(storage.get_item("k").unwrap().is_none());
    }

    #[test]
    fn test_in_memory_clones_share_connection() {
        let storage = SqliteStorage::in_memory().unwrap();
        let clone = storage.clone();

        clone.set_item("m3dp-calculator-values", "{}").unwrap();
        assert_eq!(
            storage.get_item("m3dp-calculator-values").unwrap().as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn test_reopen_keeps_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("storage.db");

        SqliteStorage::new(&path)
            .unwrap()
            .set_item("m3dp-user-profiles", "[]")
            .unwrap();

        let reopened = SqliteStorage::new(&path).unwrap();
        assert_eq!(
            reopened.get_item("m3dp-user-profiles").unwrap().as_deref(),
            Some("[]")
        );
    }
}
