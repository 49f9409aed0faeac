//! Local cache store contract and adapters.
//!
//! # Responsibility
//! - Define the key/value blob contract the session core persists through.
//! - Provide the SQLite-backed store and the typed session cache on top.
//!
//! # Invariants
//! - `get` on a missing key returns `Ok(None)`, never an error.
//! - `set` overwrites; `multi_remove` ignores missing keys.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod session_cache;
mod sqlite_store;

pub use session_cache::{SessionCache, HOUSEHOLD_KEY, USER_KEY};
pub use sqlite_store::SqliteCacheStore;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    /// Stored blob could not be decoded into the expected record.
    Corrupt { key: String, reason: String },
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Corrupt { key, reason } => write!(f, "cache entry `{key}` is corrupt: {reason}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Corrupt { .. } => None,
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistent key/value storage surviving process restarts.
pub trait LocalCacheStore: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;
    fn set(&self, key: &str, blob: &str) -> CacheResult<()>;
    fn multi_remove(&self, keys: &[&str]) -> CacheResult<()>;
}
