//! Caller-facing error taxonomy for explicit session actions.

use crate::remote::{ProviderError, RecordError, RecordKind, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Caller input rejected before any remote call.
    InvalidInput(String),
    InvalidCredentials,
    /// Provider knows the identity but the record store has no user document.
    UserNotFound,
    EmailAlreadyInUse,
    /// Transient failure that survived the retry.
    Network(String),
    /// Remote document failed boundary validation.
    MalformedRecord(RecordError),
    NotAuthenticated,
    HouseholdNotFound(String),
    /// Mutation was written but the refreshed session has no household.
    HouseholdUnresolved,
    /// A newer reconciliation started before this one could commit.
    Superseded,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::UserNotFound => write!(f, "user not found"),
            Self::EmailAlreadyInUse => write!(f, "email already in use"),
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::MalformedRecord(err) => write!(f, "{err}"),
            Self::NotAuthenticated => write!(f, "no authenticated session"),
            Self::HouseholdNotFound(id) => write!(f, "household not found: {id}"),
            Self::HouseholdUnresolved => {
                write!(f, "household was saved but could not be resolved")
            }
            Self::Superseded => write!(f, "superseded by a newer session change"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedRecord(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProviderError> for SessionError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::InvalidCredentials => Self::InvalidCredentials,
            ProviderError::UserNotFound => Self::UserNotFound,
            ProviderError::EmailAlreadyInUse => Self::EmailAlreadyInUse,
            ProviderError::Network(message) => Self::Network(message),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Network(message) => Self::Network(message),
            StoreError::NotFound {
                kind: RecordKind::Users,
                ..
            } => Self::UserNotFound,
            StoreError::NotFound {
                kind: RecordKind::Households,
                id,
            } => Self::HouseholdNotFound(id),
        }
    }
}

impl From<RecordError> for SessionError {
    fn from(value: RecordError) -> Self {
        Self::MalformedRecord(value)
    }
}
