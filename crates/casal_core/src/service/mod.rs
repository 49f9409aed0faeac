//! Mutation use-cases that write to the record store.
//!
//! # Responsibility
//! - Run account, household and category writes as sequential store calls.
//! - Close each session-shaping flow with `refresh_after_mutation`, since
//!   identity notifications never fire for data writes.
//!
//! # Invariants
//! - Multi-document writes are not atomic; a failure mid-flow leaves earlier
//!   writes in place and is reported to the caller.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod account_service;
pub mod category_service;
pub mod household_service;

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
