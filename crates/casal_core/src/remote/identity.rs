//! Remote identity provider contract.

use crate::model::identity::Identity;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Callback receiving identity-or-absent notifications in arrival order.
pub type IdentityListener = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    InvalidCredentials,
    UserNotFound,
    EmailAlreadyInUse,
    /// Transient transport failure.
    Network(String),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::UserNotFound => write!(f, "no account for these credentials"),
            Self::EmailAlreadyInUse => write!(f, "email already has an account"),
            Self::Network(message) => write!(f, "identity provider unreachable: {message}"),
        }
    }
}

impl Error for ProviderError {}

/// Handle for one identity listener.
///
/// Dropping the handle unsubscribes; `cancel` does the same explicitly.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn cancel(mut self) {
        self.run_unsubscribe();
    }

    fn run_unsubscribe(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_unsubscribe();
    }
}

/// Authentication service emitting asynchronous identity changes.
pub trait IdentityProvider: Send + Sync {
    /// Registers a listener. Implementations may deliver on any thread.
    fn subscribe(&self, listener: IdentityListener) -> Subscription;
    /// Identity known to the provider right now, if any.
    fn current_identity(&self) -> Option<Identity>;
    fn login(&self, email: &str, secret: &str) -> ProviderResult<Identity>;
    fn create_account(&self, email: &str, secret: &str) -> ProviderResult<Identity>;
    fn sign_out(&self) -> ProviderResult<()>;
}
