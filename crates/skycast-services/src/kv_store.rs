//! Flat key-value storage for favorites and preferences.
//!
//! Values are stored as JSON text under string keys. `SqliteKvStore` persists
//! to disk; `MemoryKvStore` is used when no database is available and in tests.
//! `Storage` wraps either behind a mutex and adds typed access.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use skycast_core::error::RusqliteErrorExt;
use skycast_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error for key {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(err) => AppError::Storage(err.into_storage_error()),
            StoreError::Serialization { key, source } => AppError::Storage(
                skycast_core::StorageError::Corruption(format!("{}: {}", key, source)),
            ),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raw string storage by key.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Returns whether the key existed.
    fn remove(&mut self, key: &str) -> StoreResult<bool>;
}

/// SQLite-backed key-value store.
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    /// Open (or create) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<bool> {
        let rows = self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<bool> {
        Ok(self.values.remove(key).is_some())
    }
}

/// Shared, typed handle over a key-value store.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<Mutex<dyn KeyValueStore>>,
}

impl Storage {
    pub fn new<S: KeyValueStore + 'static>(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn memory() -> Self {
        Self::new(MemoryKvStore::default())
    }

    /// Typed read. `Ok(None)` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let raw = self.inner.lock().get(key)?;
        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    /// Typed read that never fails: missing or unreadable values yield `default`.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!("Storage get error for key {}: {}", key, e);
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let text = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.inner.lock().set(key, &text)
    }

    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        self.inner.lock().remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_set_get_remove() {
        let mut store = SqliteKvStore::in_memory().unwrap();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_sqlite_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");

        {
            let mut store = SqliteKvStore::open(&path).unwrap();
            store.set("darkMode", "true").unwrap();
        }

        let store = SqliteKvStore::open(&path).unwrap();
        assert_eq!(store.get("darkMode").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_typed_roundtrip() {
        let storage = Storage::memory();
        storage.set("cities", &vec!["Ankara", "Izmir"]).unwrap();
        let cities: Option<Vec<String>> = storage.get("cities").unwrap();
        assert_eq!(cities, Some(vec!["Ankara".to_string(), "Izmir".to_string()]));
    }

    #[test]
    fn test_corrupt_value_falls_back_to_default() {
        let mut raw = MemoryKvStore::default();
        raw.set("cities", "{not json").unwrap();
        let storage = Storage::new(raw);

        assert!(storage.get::<Vec<String>>("cities").is_err());
        assert!(storage.get_or::<Vec<String>>("cities", Vec::new()).is_empty());
    }

    #[test]
    fn test_store_error_maps_to_storage_corruption() {
        let storage = Storage::memory();
        storage.inner.lock().set("k", "oops").unwrap();
        let err: AppError = storage.get::<bool>("k").unwrap_err().into();
        assert!(matches!(
            err,
            AppError::Storage(skycast_core::StorageError::Corruption(_))
        ));
    }
}
