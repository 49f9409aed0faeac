//! Record fetch with bounded retry.
//!
//! # Invariants
//! - Only transient (`Network`) failures are retried.
//! - "Absent" is a definitive answer and is never retried.
//! - Malformed documents fail without retry; refetching cannot fix them.

use crate::model::household::HouseholdRecord;
use crate::model::identity::Identity;
use crate::model::user::UserRecord;
use crate::remote::{
    decode_household, decode_user, Document, RecordError, RecordKind, RecordStore, StoreError,
};
use crate::session::error::SessionError;
use log::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FetchFailure {
    Network(String),
    Malformed(RecordError),
}

impl From<FetchFailure> for SessionError {
    fn from(value: FetchFailure) -> Self {
        match value {
            FetchFailure::Network(message) => Self::Network(message),
            FetchFailure::Malformed(err) => Self::MalformedRecord(err),
        }
    }
}

pub(crate) struct RecordFetcher<'a> {
    store: &'a dyn RecordStore,
    attempts: u32,
}

impl<'a> RecordFetcher<'a> {
    pub(crate) fn new(store: &'a dyn RecordStore, attempts: u32) -> Self {
        Self {
            store,
            attempts: attempts.max(1),
        }
    }

    pub(crate) fn user(&self, identity: &Identity) -> Result<Option<UserRecord>, FetchFailure> {
        match self.document(RecordKind::Users, identity.uid())? {
            Some(document) => decode_user(identity, &document)
                .map(Some)
                .map_err(FetchFailure::Malformed),
            None => Ok(None),
        }
    }

    pub(crate) fn household(&self, id: &str) -> Result<Option<HouseholdRecord>, FetchFailure> {
        match self.document(RecordKind::Households, id)? {
            Some(document) => decode_household(id, &document)
                .map(Some)
                .map_err(FetchFailure::Malformed),
            None => Ok(None),
        }
    }

    fn document(&self, kind: RecordKind, id: &str) -> Result<Option<Document>, FetchFailure> {
        let mut attempt = 1;
        loop {
            match self.store.get_record(kind, id) {
                Ok(document) => return Ok(document),
                Err(StoreError::NotFound { .. }) => return Ok(None),
                Err(StoreError::Network(message)) => {
                    if attempt >= self.attempts {
                        warn!(
                            "event=record_fetch module=session status=error kind={} id={} attempt={} error_code=network",
                            kind.as_str(),
                            id,
                            attempt
                        );
                        return Err(FetchFailure::Network(message));
                    }
                    warn!(
                        "event=record_fetch module=session status=retry kind={} id={} attempt={}",
                        kind.as_str(),
                        id,
                        attempt
                    );
                    attempt += 1;
                }
            }
        }
    }
}
