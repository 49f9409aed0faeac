//! Runtime configuration for the session core.
//!
//! # Responsibility
//! - Resolve cache location, log level and fetch retry policy.
//! - Read overrides from `CASAL_*` environment variables.
//!
//! # Invariants
//! - Blank environment values fall back to defaults.
//! - `fetch_attempts` is always within `1..=MAX_FETCH_ATTEMPTS`.

use crate::cache::{CacheResult, SqliteCacheStore};
use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_CACHE_PATH: &str = "CASAL_CACHE_PATH";
pub const ENV_LOG_LEVEL: &str = "CASAL_LOG_LEVEL";
pub const ENV_FETCH_ATTEMPTS: &str = "CASAL_FETCH_ATTEMPTS";

const CACHE_FILE_NAME: &str = "casal_session_cache.sqlite3";
/// Initial fetch plus one retry.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 2;
pub const MAX_FETCH_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// SQLite file backing the local cache store.
    pub cache_path: PathBuf,
    pub log_level: &'static str,
    /// Total tries per remote read, first attempt included.
    pub fetch_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_path: std::env::temp_dir().join(CACHE_FILE_NAME),
            log_level: default_log_level(),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
        }
    }
}

impl SessionConfig {
    /// Builds a config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = read(ENV_CACHE_PATH) {
            config.cache_path = PathBuf::from(path);
        }

        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level =
                normalize_level(&level).map_err(|reason| ConfigError::InvalidValue {
                    key: ENV_LOG_LEVEL,
                    value: level.clone(),
                    reason,
                })?;
        }

        if let Some(raw) = read(ENV_FETCH_ATTEMPTS) {
            config.fetch_attempts = parse_fetch_attempts(&raw)?;
        }

        Ok(config)
    }

    pub fn with_fetch_attempts(mut self, attempts: u32) -> Result<Self, ConfigError> {
        self.fetch_attempts = validate_fetch_attempts(attempts, attempts.to_string())?;
        Ok(self)
    }

    /// Opens the SQLite-backed local cache store at `cache_path`.
    pub fn open_cache(&self) -> CacheResult<SqliteCacheStore> {
        SqliteCacheStore::open(&self.cache_path)
    }
}

fn parse_fetch_attempts(raw: &str) -> Result<u32, ConfigError> {
    let attempts = raw
        .parse::<u32>()
        .map_err(|err| ConfigError::InvalidValue {
            key: ENV_FETCH_ATTEMPTS,
            value: raw.to_string(),
            reason: err.to_string(),
        })?;
    validate_fetch_attempts(attempts, raw.to_string())
}

fn validate_fetch_attempts(attempts: u32, raw: String) -> Result<u32, ConfigError> {
    if !(1..=MAX_FETCH_ATTEMPTS).contains(&attempts) {
        return Err(ConfigError::InvalidValue {
            key: ENV_FETCH_ATTEMPTS,
            value: raw,
            reason: format!("expected 1..={MAX_FETCH_ATTEMPTS}"),
        });
    }
    Ok(attempts)
}
