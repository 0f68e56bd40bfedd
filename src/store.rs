use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};

// Namespaced keys shared by every page of the dashboard.
pub const KEY_THEME: &str = "ede_theme";
pub const KEY_AUTH: &str = "ede_authed";
pub const KEY_ENV: &str = "ede_env";
pub const KEY_API_KEY: &str = "ede_api_key";
pub const KEY_HISTORY: &str = "ede_history";
pub const KEY_REPORT: &str = "ede_last_report";
pub const KEY_LAST_GLOBAL: &str = "ede_last_global";

/// Device-local persisted string store. Survives restarts, cleared only by
/// explicit user action. Read errors collapse to `None`; higher components
/// must treat malformed values as their empty default.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One store shared by session, ledger and report views, the way every page
/// of a browser origin shares one localStorage. Access is read-modify-write
/// without cross-handle locking beyond the mutex; last write wins at the
/// granularity of a full value.
pub type SharedStore = Arc<Mutex<dyn KvStore + Send>>;

pub fn shared(store: impl KvStore + Send + 'static) -> SharedStore {
    Arc::new(Mutex::new(store))
}

pub fn kv_get(store: &SharedStore, key: &str) -> Option<String> {
    store.lock().ok().and_then(|s| s.get(key))
}

pub fn kv_set(store: &SharedStore, key: &str, value: &str) -> Result<()> {
    store
        .lock()
        .map_err(|_| anyhow!("store lock poisoned"))?
        .set(key, value)
}

pub fn kv_remove(store: &SharedStore, key: &str) -> Result<()> {
    store
        .lock()
        .map_err(|_| anyhow!("store lock poisoned"))?
        .remove(key)
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(Self { conn })
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemStore {
    map: HashMap<String, String>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_roundtrip() {
        let mut store = MemStore::new();
        assert!(store.get("missing").is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v2"));

        store.remove("k").unwrap();
        assert!(store.get("k").is_none());
    }

    #[test]
    fn test_mem_store_remove_missing_is_noop() {
        let mut store = MemStore::new();
        store.remove("never-set").unwrap();
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.sqlite");
        let mut store = SqliteStore::open(path.to_str().unwrap()).unwrap();

        store.set(KEY_THEME, "light").unwrap();
        store.set(KEY_THEME, "dark").unwrap();
        assert_eq!(store.get(KEY_THEME).as_deref(), Some("dark"));

        store.remove(KEY_THEME).unwrap();
        assert!(store.get(KEY_THEME).is_none());
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.sqlite");
        let path = path.to_str().unwrap();

        {
            let mut store = SqliteStore::open(path).unwrap();
            store.set(KEY_ENV, "stage").unwrap();
        }
        let store = SqliteStore::open(path).unwrap();
        assert_eq!(store.get(KEY_ENV).as_deref(), Some("stage"));
    }

    #[test]
    fn test_shared_helpers() {
        let store = shared(MemStore::new());
        assert!(kv_get(&store, "a").is_none());
        kv_set(&store, "a", "1").unwrap();
        assert_eq!(kv_get(&store, "a").as_deref(), Some("1"));
        kv_remove(&store, "a").unwrap();
        assert!(kv_get(&store, "a").is_none());
    }
}
