//! Account sign-up use-case.

use crate::model::session::SessionState;
use crate::remote::document::user_document;
use crate::remote::{IdentityProvider, RecordKind, RecordStore};
use crate::service::now_epoch_ms;
use crate::session::{SessionError, SessionReconciler, SessionResult};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Provider-side minimum secret length.
pub const MIN_SECRET_CHARS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub display_name: String,
    pub email: String,
    pub secret: String,
    pub confirm_secret: String,
}

pub struct AccountService {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn RecordStore>,
    reconciler: Arc<SessionReconciler>,
}

impl AccountService {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn RecordStore>,
        reconciler: Arc<SessionReconciler>,
    ) -> Self {
        Self {
            provider,
            store,
            reconciler,
        }
    }

    /// Creates the provider account and its user document.
    ///
    /// # Contract
    /// - Input is validated before any remote call.
    /// - On success the session is `AuthenticatedNoHousehold`.
    /// - If the user document write fails the account still exists remotely;
    ///   the error is returned and the session stays unauthenticated.
    pub fn sign_up(&self, request: &SignUpRequest) -> SessionResult<SessionState> {
        let display_name = request.display_name.trim();
        let email = request.email.trim();
        validate_sign_up(display_name, email, request)?;

        let identity = self.provider.create_account(email, &request.secret)?;
        info!(
            "event=account_sign_up module=service status=account_created uid={}",
            identity
        );

        if let Err(err) = self.store.set_record(
            RecordKind::Users,
            identity.uid(),
            user_document(display_name, email, now_epoch_ms()),
        ) {
            warn!(
                "event=account_sign_up module=service status=error uid={} error={}",
                identity, err
            );
            return Err(err.into());
        }

        self.reconciler.refresh_after_mutation(&identity)
    }
}

fn validate_sign_up(
    display_name: &str,
    email: &str,
    request: &SignUpRequest,
) -> Result<(), SessionError> {
    if display_name.is_empty() {
        return Err(SessionError::InvalidInput(
            "display name is required".to_string(),
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(SessionError::InvalidInput(
            "email is not well-formed".to_string(),
        ));
    }
    if request.secret.chars().count() < MIN_SECRET_CHARS {
        return Err(SessionError::InvalidInput(format!(
            "secret must have at least {MIN_SECRET_CHARS} characters"
        )));
    }
    if request.secret != request.confirm_secret {
        return Err(SessionError::InvalidInput(
            "secret confirmation does not match".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_sign_up, SignUpRequest};
    use crate::session::SessionError;

    fn request(email: &str, secret: &str, confirm: &str) -> SignUpRequest {
        SignUpRequest {
            display_name: "Ana".to_string(),
            email: email.to_string(),
            secret: secret.to_string(),
            confirm_secret: confirm.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_request() {
        let req = request("ana@example.com", "s3cret!", "s3cret!");
        assert_eq!(validate_sign_up("Ana", "ana@example.com", &req), Ok(()));
    }

    #[test]
    fn rejects_malformed_email_short_secret_and_mismatch() {
        for (email, secret, confirm) in [
            ("ana.example.com", "s3cret!", "s3cret!"),
            ("ana@example.com", "123", "123"),
            ("ana@example.com", "s3cret!", "s3cret?"),
        ] {
            let req = request(email, secret, confirm);
            assert!(matches!(
                validate_sign_up("Ana", email, &req),
                Err(SessionError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn rejects_blank_display_name() {
        let req = request("ana@example.com", "s3cret!", "s3cret!");
        assert!(matches!(
            validate_sign_up("", "ana@example.com", &req),
            Err(SessionError::InvalidInput(_))
        ));
    }
}
