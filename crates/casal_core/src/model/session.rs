//! Exposed session aggregate.
//!
//! # Responsibility
//! - Hold the identity, user and household view shown to screens.
//! - Derive the lifecycle phase from what is present.
//!
//! # Invariants
//! - `is_authenticated()` is true iff identity and user record are both present.
//! - A household is present only if `user.household_id` equals its id.
//! - Fields are private; the only way to build an authenticated state is
//!   `AuthenticatedSession::new`, which enforces both rules above.

use crate::model::household::HouseholdRecord;
use crate::model::identity::Identity;
use crate::model::user::UserRecord;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lifecycle phase of the session reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapping,
    Unauthenticated,
    AuthenticatedNoHousehold,
    AuthenticatedWithHousehold,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bootstrapping => "bootstrapping",
            Self::Unauthenticated => "unauthenticated",
            Self::AuthenticatedNoHousehold => "authenticated_no_household",
            Self::AuthenticatedWithHousehold => "authenticated_with_household",
        }
    }
}

/// Where the records of an authenticated session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Confirmed by a live record-store fetch.
    Fresh,
    /// Optimistically restored from the local cache at bootstrap.
    Hydrated,
    /// Cache fallback after a live fetch could not complete.
    Stale,
}

impl Freshness {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Hydrated => "hydrated",
            Self::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInvariantError {
    UserIdentityMismatch { identity_uid: String, user_uid: String },
    HouseholdNotReferenced { household_id: String },
}

impl Display for SessionInvariantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserIdentityMismatch {
                identity_uid,
                user_uid,
            } => write!(
                f,
                "user record `{user_uid}` does not belong to identity `{identity_uid}`"
            ),
            Self::HouseholdNotReferenced { household_id } => write!(
                f,
                "household `{household_id}` is not referenced by the user record"
            ),
        }
    }
}

impl Error for SessionInvariantError {}

/// Consistent authenticated payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    identity: Identity,
    user: UserRecord,
    household: Option<HouseholdRecord>,
    freshness: Freshness,
}

impl AuthenticatedSession {
    pub fn new(
        identity: Identity,
        user: UserRecord,
        household: Option<HouseholdRecord>,
        freshness: Freshness,
    ) -> Result<Self, SessionInvariantError> {
        if !user.belongs_to(&identity) {
            return Err(SessionInvariantError::UserIdentityMismatch {
                identity_uid: identity.uid().to_string(),
                user_uid: user.uid,
            });
        }
        if let Some(household) = household.as_ref() {
            if user.household_id.as_deref() != Some(household.id.as_str()) {
                return Err(SessionInvariantError::HouseholdNotReferenced {
                    household_id: household.id.clone(),
                });
            }
        }
        Ok(Self {
            identity,
            user,
            household,
            freshness,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user(&self) -> &UserRecord {
        &self.user
    }

    pub fn household(&self) -> Option<&HouseholdRecord> {
        self.household.as_ref()
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }
}

/// Snapshot of the session handed to observers and callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    bootstrapping: bool,
    session: Option<AuthenticatedSession>,
    loading: bool,
}

impl SessionState {
    /// Process-start state: nothing known yet, loading.
    pub fn bootstrapping() -> Self {
        Self {
            bootstrapping: true,
            session: None,
            loading: true,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            bootstrapping: false,
            session: None,
            loading: false,
        }
    }

    pub fn authenticated(session: AuthenticatedSession) -> Self {
        Self {
            bootstrapping: false,
            session: Some(session),
            loading: false,
        }
    }

    /// Same contents with a different loading flag.
    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        match self.session.as_ref() {
            Some(session) if session.household.is_some() => {
                SessionPhase::AuthenticatedWithHousehold
            }
            Some(_) => SessionPhase::AuthenticatedNoHousehold,
            None if self.bootstrapping => SessionPhase::Bootstrapping,
            None => SessionPhase::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(AuthenticatedSession::identity)
    }

    pub fn user_record(&self) -> Option<&UserRecord> {
        self.session.as_ref().map(AuthenticatedSession::user)
    }

    pub fn household_record(&self) -> Option<&HouseholdRecord> {
        self.session.as_ref().and_then(AuthenticatedSession::household)
    }

    /// `None` while unauthenticated.
    pub fn freshness(&self) -> Option<Freshness> {
        self.session.as_ref().map(AuthenticatedSession::freshness)
    }

    pub fn is_stale(&self) -> bool {
        self.freshness() == Some(Freshness::Stale)
    }

    pub fn session(&self) -> Option<&AuthenticatedSession> {
        self.session.as_ref()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::bootstrapping()
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthenticatedSession, Freshness, SessionInvariantError, SessionPhase, SessionState};
    use crate::model::household::HouseholdRecord;
    use crate::model::identity::Identity;
    use crate::model::user::UserRecord;

    fn user(uid: &str, household_id: Option<&str>) -> UserRecord {
        UserRecord {
            uid: uid.to_string(),
            display_name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            household_id: household_id.map(str::to_string),
        }
    }

    #[test]
    fn bootstrapping_is_loading_and_unauthenticated() {
        let state = SessionState::bootstrapping();
        assert_eq!(state.phase(), SessionPhase::Bootstrapping);
        assert!(state.is_loading());
        assert!(!state.is_authenticated());
        assert!(state.identity().is_none());
        assert!(state.user_record().is_none());
    }

    #[test]
    fn authenticated_requires_matching_user() {
        let err = AuthenticatedSession::new(
            Identity::new("u-1", "ana@example.com"),
            user("u-2", None),
            None,
            Freshness::Fresh,
        )
        .expect_err("user of another identity must be rejected");
        assert!(matches!(
            err,
            SessionInvariantError::UserIdentityMismatch { .. }
        ));
    }

    #[test]
    fn household_must_be_referenced_by_user() {
        let err = AuthenticatedSession::new(
            Identity::new("u-1", "ana@example.com"),
            user("u-1", Some("h-other")),
            Some(HouseholdRecord::new("h-1", "Casa", "u-1", 0)),
            Freshness::Fresh,
        )
        .expect_err("unreferenced household must be rejected");
        assert!(matches!(
            err,
            SessionInvariantError::HouseholdNotReferenced { .. }
        ));
    }

    #[test]
    fn phase_tracks_household_presence() {
        let without = SessionState::authenticated(
            AuthenticatedSession::new(
                Identity::new("u-1", "ana@example.com"),
                user("u-1", Some("h-1")),
                None,
                Freshness::Fresh,
            )
            .expect("valid session"),
        );
        assert_eq!(without.phase(), SessionPhase::AuthenticatedNoHousehold);
        assert!(without.is_authenticated());

        let with = SessionState::authenticated(
            AuthenticatedSession::new(
                Identity::new("u-1", "ana@example.com"),
                user("u-1", Some("h-1")),
                Some(HouseholdRecord::new("h-1", "Casa", "u-1", 0)),
                Freshness::Stale,
            )
            .expect("valid session"),
        );
        assert_eq!(with.phase(), SessionPhase::AuthenticatedWithHousehold);
        assert!(with.is_stale());
        assert_eq!(
            with.household_record().map(|h| h.id.as_str()),
            with.user_record().and_then(|u| u.household_id.as_deref())
        );
    }

    #[test]
    fn with_loading_keeps_contents() {
        let state = SessionState::unauthenticated().with_loading(true);
        assert!(state.is_loading());
        assert_eq!(state.phase(), SessionPhase::Unauthenticated);
    }
}
