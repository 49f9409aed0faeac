//! SQLite implementation of `LocalCacheStore`.

use super::{CacheResult, LocalCacheStore};
use crate::db::{open_db, open_db_in_memory};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Cache store over one `cache_entries` table.
///
/// The connection is guarded by a mutex so the store can be shared between
/// the reconciler and provider callback threads.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Opens (and migrates) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> CacheResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl LocalCacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, blob: &str) -> CacheResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO cache_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, blob],
        )?;
        Ok(())
    }

    fn multi_remove(&self, keys: &[&str]) -> CacheResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM cache_entries WHERE key = ?1;", [*key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteCacheStore;
    use crate::cache::LocalCacheStore;

    #[test]
    fn get_missing_key_returns_none() {
        let store = SqliteCacheStore::open_in_memory().expect("open cache");
        assert_eq!(store.get("absent").expect("get"), None);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = SqliteCacheStore::open_in_memory().expect("open cache");
        store.set("k", "first").expect("first set");
        store.set("k", "second").expect("second set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("second"));
    }

    #[test]
    fn multi_remove_ignores_missing_keys() {
        let store = SqliteCacheStore::open_in_memory().expect("open cache");
        store.set("a", "1").expect("set a");
        store.multi_remove(&["a", "never-set"]).expect("remove");
        assert_eq!(store.get("a").expect("get"), None);
    }
}
