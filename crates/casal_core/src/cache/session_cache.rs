//! Typed session cache over a `LocalCacheStore`.
//!
//! # Responsibility
//! - Serialize user/household records into the two well-known keys.
//! - Turn undecodable blobs into misses instead of failures.
//!
//! # Invariants
//! - A written household is always the one referenced by the written user.
//! - Partial clears are tolerated; the next fetch overwrites both keys.

use super::{CacheError, CacheResult, LocalCacheStore};
use crate::model::household::HouseholdRecord;
use crate::model::user::UserRecord;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub const USER_KEY: &str = "user_record";
pub const HOUSEHOLD_KEY: &str = "household_record";

#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn LocalCacheStore>,
}

impl SessionCache {
    pub fn new(store: Arc<dyn LocalCacheStore>) -> Self {
        Self { store }
    }

    /// Reads the cached user record; missing entries yield `None` and corrupt
    /// ones are deleted, then yield `None`.
    pub fn read_user(&self) -> CacheResult<Option<UserRecord>> {
        let user = self.read_blob::<UserRecord>(USER_KEY)?;
        match user {
            Some(user) => match user.validate() {
                Ok(()) => Ok(Some(user)),
                Err(err) => Ok(self.discard_corrupt(USER_KEY, &err.to_string())),
            },
            None => Ok(None),
        }
    }

    /// Reads the cached household record, with the same handling as `read_user`.
    pub fn read_household(&self) -> CacheResult<Option<HouseholdRecord>> {
        let household = self.read_blob::<HouseholdRecord>(HOUSEHOLD_KEY)?;
        match household {
            Some(household) => match household.validate() {
                Ok(()) => Ok(Some(household)),
                Err(err) => Ok(self.discard_corrupt(HOUSEHOLD_KEY, &err.to_string())),
            },
            None => Ok(None),
        }
    }

    /// Overwrites the cached user and replaces or removes the household.
    pub fn write(
        &self,
        user: &UserRecord,
        household: Option<&HouseholdRecord>,
    ) -> CacheResult<()> {
        self.store.set(USER_KEY, &encode(USER_KEY, user)?)?;
        match household {
            Some(household) => self
                .store
                .set(HOUSEHOLD_KEY, &encode(HOUSEHOLD_KEY, household)?),
            None => self.store.multi_remove(&[HOUSEHOLD_KEY]),
        }
    }

    pub fn clear(&self) -> CacheResult<()> {
        self.store.multi_remove(&[USER_KEY, HOUSEHOLD_KEY])
    }

    fn read_blob<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let Some(blob) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<T>(&blob) {
            Ok(value) => Ok(Some(value)),
            Err(err) => Ok(self.discard_corrupt(key, &err.to_string())),
        }
    }

    fn discard_corrupt<T>(&self, key: &str, reason: &str) -> Option<T> {
        let err = CacheError::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        warn!("event=cache_read module=cache status=corrupt key={key} error={err}");
        if let Err(remove_err) = self.store.multi_remove(&[key]) {
            warn!("event=cache_discard module=cache status=error key={key} error={remove_err}");
        }
        None
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> CacheResult<String> {
    serde_json::to_string(value).map_err(|err| CacheError::Corrupt {
        key: key.to_string(),
        reason: err.to_string(),
    })
}
