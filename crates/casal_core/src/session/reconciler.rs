//! Session reconciler state machine.
//!
//! # Responsibility
//! - Subscribe to identity notifications and hydrate from the local cache.
//! - Fetch user/household records and merge them into one `SessionState`.
//! - Serve explicit `login`, `logout` and `refresh_after_mutation` calls.
//!
//! # Invariants
//! - Each reconciliation takes a generation ticket when it starts; only the
//!   holder of the newest ticket may commit (last-notification-wins).
//! - Commits (state swap, cache write/clear, broadcast) run under one
//!   transition gate, so observers see transitions in commit order.
//! - An explicit action overtaken by a newer reconciliation waits for it to
//!   settle and reports `Superseded` only if the winner is another identity
//!   or a sign-out.
//! - Notification-driven failures resolve to a state, never to an error.
//! - Cache hydration applies only while no live reconciliation has started.

use crate::cache::SessionCache;
use crate::config::SessionConfig;
use crate::model::household::HouseholdRecord;
use crate::model::identity::Identity;
use crate::model::session::{AuthenticatedSession, Freshness, SessionPhase, SessionState};
use crate::model::user::UserRecord;
use crate::remote::{IdentityProvider, RecordStore, Subscription};
use crate::session::error::{SessionError, SessionResult};
use crate::session::fetch::{FetchFailure, RecordFetcher};
use crate::session::observer::{ObserverId, ObserverList};
use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex, ReentrantMutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on waiting for an overtaking reconciliation to commit.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Generation number handed out when a reconciliation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket(u64);

/// Outcome a reconciliation wants to commit.
enum Resolution {
    SignedOut,
    Authenticated {
        session: AuthenticatedSession,
        /// Write the records to the local cache on commit.
        persist: bool,
    },
}

/// Owner of the process-wide session.
pub struct SessionReconciler {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn RecordStore>,
    cache: SessionCache,
    fetch_attempts: u32,
    state: Mutex<SessionState>,
    generation: AtomicU64,
    transitions: ReentrantMutex<()>,
    /// Generation of the last applied commit.
    settled: Mutex<u64>,
    settled_changed: Condvar,
    observers: ObserverList,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionReconciler {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn RecordStore>,
        cache: SessionCache,
        config: &SessionConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            store,
            cache,
            fetch_attempts: config.fetch_attempts,
            state: Mutex::new(SessionState::bootstrapping()),
            generation: AtomicU64::new(0),
            transitions: ReentrantMutex::new(()),
            settled: Mutex::new(0),
            settled_changed: Condvar::new(),
            observers: ObserverList::default(),
            subscription: Mutex::new(None),
        })
    }

    /// Subscribes to identity notifications, then hydrates from the cache.
    ///
    /// Calling `start` again replaces the previous subscription.
    pub fn start(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let listener = move |identity: Option<Identity>| {
            if let Some(reconciler) = weak.upgrade() {
                reconciler.handle_identity_change(identity);
            }
        };
        let subscription = self.provider.subscribe(Arc::new(listener));
        *self.subscription.lock() = Some(subscription);
        info!("event=session_start module=session status=ok");
        self.hydrate_from_cache();
    }

    /// Drops the identity subscription. The current state is kept.
    pub fn shutdown(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.cancel();
        }
        info!("event=session_shutdown module=session status=ok");
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Registers an observer called synchronously after every transition.
    pub fn observe(&self, observer: impl Fn(&SessionState) + Send + Sync + 'static) -> ObserverId {
        self.observers.add(Arc::new(observer))
    }

    pub fn unobserve(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Reacts to one provider notification.
    ///
    /// Errors are absorbed: the session ends authenticated (fresh or stale)
    /// or unauthenticated.
    pub fn handle_identity_change(&self, identity: Option<Identity>) {
        let ticket = self.begin("identity_change");
        let resolution = match identity {
            None => Resolution::SignedOut,
            Some(identity) => self.resolve(&identity).0,
        };
        self.commit(ticket, resolution);
    }

    /// Signs in with the provider and reconciles the resulting identity.
    ///
    /// Succeeds when the session ends authenticated, stale included.
    pub fn login(&self, email: &str, secret: &str) -> SessionResult<SessionState> {
        let email = email.trim();
        if email.is_empty() || secret.is_empty() {
            return Err(SessionError::InvalidInput(
                "email and secret are required".to_string(),
            ));
        }

        let identity = self.provider.login(email, secret).map_err(|err| {
            warn!("event=session_login module=session status=error error={err}");
            SessionError::from(err)
        })?;

        let (state, failure) = self.reconcile_explicit(&identity, "login")?;
        match failure {
            Some(err) if !state.is_authenticated() => Err(err),
            _ => Ok(state),
        }
    }

    /// Re-runs fetch-and-merge after an external write to the record store.
    ///
    /// Succeeds only when the records were fetched live; a stale fallback is
    /// still applied to the session but reported as an error.
    pub fn refresh_after_mutation(&self, identity: &Identity) -> SessionResult<SessionState> {
        let (state, failure) = self.reconcile_explicit(identity, "refresh_after_mutation")?;
        match failure {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    /// Signs out remotely, then always clears the local session. Idempotent.
    pub fn logout(&self) {
        if let Err(err) = self.provider.sign_out() {
            warn!("event=session_logout module=session status=remote_error error={err}");
        }
        let ticket = self.begin("logout");
        self.commit(ticket, Resolution::SignedOut);
    }

    fn reconcile_explicit(
        &self,
        identity: &Identity,
        reason: &'static str,
    ) -> SessionResult<(SessionState, Option<SessionError>)> {
        let ticket = self.begin(reason);
        let (resolution, failure) = self.resolve(identity);
        if let Some(state) = self.commit(ticket, resolution) {
            return Ok((state, failure));
        }

        let state = self.wait_settled();
        if state.identity() != Some(identity) {
            // Our own fetch failure explains a signed-out winner better.
            if let (None, Some(err)) = (state.identity(), failure.as_ref()) {
                return Err(err.clone());
            }
            info!(
                "event=session_reconcile module=session status=superseded generation={} reason={}",
                ticket.0, reason
            );
            return Err(SessionError::Superseded);
        }
        debug!(
            "event=session_reconcile module=session status=adopted generation={} reason={}",
            ticket.0, reason
        );
        let failure = match state.freshness() {
            Some(Freshness::Fresh) => None,
            _ => failure.or_else(|| {
                Some(SessionError::Network(
                    "session resolved from cached records".to_string(),
                ))
            }),
        };
        Ok((state, failure))
    }

    /// Blocks until the newest started reconciliation has committed.
    ///
    /// Returns the state at that point, or the current state on timeout.
    fn wait_settled(&self) -> SessionState {
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        let mut settled = self.settled.lock();
        while *settled < self.generation.load(Ordering::SeqCst) {
            if self
                .settled_changed
                .wait_until(&mut settled, deadline)
                .timed_out()
            {
                warn!("event=session_reconcile module=session status=settle_timeout");
                break;
            }
        }
        drop(settled);
        self.snapshot()
    }

    fn hydrate_from_cache(&self) {
        let user = self.cache.read_user().unwrap_or_else(|err| {
            warn!("event=session_hydrate module=session status=cache_error error={err}");
            None
        });
        let household = match user.as_ref() {
            Some(user) => self.cached_household_for(user),
            None => None,
        };
        let provider_has_identity = self.provider.current_identity().is_some();

        let _gate = self.transitions.lock();
        if self.generation.load(Ordering::SeqCst) != 0
            || self.state.lock().phase() != SessionPhase::Bootstrapping
        {
            debug!("event=session_hydrate module=session status=skipped reason=live_state");
            return;
        }

        let next = match user {
            Some(user) => {
                match AuthenticatedSession::new(user.identity(), user, household, Freshness::Hydrated)
                {
                    Ok(session) => {
                        SessionState::authenticated(session).with_loading(provider_has_identity)
                    }
                    Err(err) => {
                        warn!("event=session_hydrate module=session status=inconsistent error={err}");
                        return;
                    }
                }
            }
            None if provider_has_identity => {
                debug!("event=session_hydrate module=session status=miss awaiting=notification");
                return;
            }
            None => SessionState::unauthenticated(),
        };
        self.publish(next, 0, "hydrate");
    }

    /// Takes a new generation ticket and raises the loading flag.
    fn begin(&self, reason: &'static str) -> Ticket {
        let _gate = self.transitions.lock();
        let ticket = Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
        debug!(
            "event=session_reconcile module=session status=start generation={} reason={}",
            ticket.0, reason
        );
        let loading = self.state.lock().clone().with_loading(true);
        self.publish(loading, ticket.0, reason);
        ticket
    }

    /// Applies `resolution` if `ticket` is still the newest generation.
    ///
    /// Returns the committed state, or `None` when the result was discarded.
    fn commit(&self, ticket: Ticket, resolution: Resolution) -> Option<SessionState> {
        let _gate = self.transitions.lock();
        let current = self.generation.load(Ordering::SeqCst);
        if current != ticket.0 {
            info!(
                "event=session_reconcile module=session status=discarded generation={} newest={}",
                ticket.0, current
            );
            return None;
        }

        let next = match resolution {
            Resolution::SignedOut => {
                if let Err(err) = self.cache.clear() {
                    warn!("event=cache_clear module=session status=error error={err}");
                }
                SessionState::unauthenticated()
            }
            Resolution::Authenticated { session, persist } => {
                if persist {
                    if let Err(err) = self.cache.write(session.user(), session.household()) {
                        warn!("event=cache_write module=session status=error error={err}");
                    }
                }
                SessionState::authenticated(session)
            }
        };
        self.publish(next.clone(), ticket.0, "commit");
        {
            // A commit made re-entrantly from an observer may already be newer.
            let mut settled = self.settled.lock();
            *settled = (*settled).max(ticket.0);
        }
        self.settled_changed.notify_all();
        Some(next)
    }

    fn publish(&self, next: SessionState, generation: u64, reason: &'static str) {
        *self.state.lock() = next.clone();
        info!(
            "event=session_transition module=session status=ok generation={} reason={} phase={} freshness={} loading={}",
            generation,
            reason,
            next.phase().as_str(),
            next.freshness().map_or("none", Freshness::as_str),
            next.is_loading()
        );
        self.observers.notify(&next);
    }

    /// Fetches and merges records for `identity` without touching state.
    ///
    /// The error half is what an explicit caller should see; the resolution
    /// is always safe to commit.
    fn resolve(&self, identity: &Identity) -> (Resolution, Option<SessionError>) {
        let fetcher = RecordFetcher::new(self.store.as_ref(), self.fetch_attempts);

        let user = match fetcher.user(identity) {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(
                    "event=session_resolve module=session status=user_missing uid={}",
                    identity
                );
                return (Resolution::SignedOut, Some(SessionError::UserNotFound));
            }
            Err(failure) => return self.fallback(identity, failure),
        };

        let Some(household_id) = user.household_id.clone() else {
            return self.authenticated(identity, user, None, Freshness::Fresh, None);
        };

        match fetcher.household(&household_id) {
            Ok(Some(household)) => {
                self.authenticated(identity, user, Some(household), Freshness::Fresh, None)
            }
            Ok(None) => {
                warn!(
                    "event=session_resolve module=session status=household_missing uid={} household_id={}",
                    identity, household_id
                );
                self.authenticated(identity, user, None, Freshness::Fresh, None)
            }
            Err(failure) => {
                let household = self.cached_household_for(&user);
                self.authenticated(
                    identity,
                    user,
                    household,
                    Freshness::Stale,
                    Some(failure.into()),
                )
            }
        }
    }

    /// Falls back to the cached records after the user fetch failed.
    fn fallback(
        &self,
        identity: &Identity,
        failure: FetchFailure,
    ) -> (Resolution, Option<SessionError>) {
        let cached = self.cache.read_user().unwrap_or_else(|err| {
            warn!("event=session_fallback module=session status=cache_error error={err}");
            None
        });
        match cached.filter(|user| user.belongs_to(identity)) {
            Some(user) => {
                info!(
                    "event=session_fallback module=session status=stale uid={}",
                    identity
                );
                let household = self.cached_household_for(&user);
                self.authenticated(
                    identity,
                    user,
                    household,
                    Freshness::Stale,
                    Some(failure.into()),
                )
            }
            None => {
                warn!(
                    "event=session_fallback module=session status=miss uid={}",
                    identity
                );
                (Resolution::SignedOut, Some(failure.into()))
            }
        }
    }

    fn authenticated(
        &self,
        identity: &Identity,
        user: UserRecord,
        household: Option<HouseholdRecord>,
        freshness: Freshness,
        failure: Option<SessionError>,
    ) -> (Resolution, Option<SessionError>) {
        match AuthenticatedSession::new(identity.clone(), user, household, freshness) {
            Ok(session) => (
                Resolution::Authenticated {
                    session,
                    persist: freshness == Freshness::Fresh,
                },
                failure,
            ),
            Err(err) => {
                error!("event=session_resolve module=session status=inconsistent error={err}");
                (
                    Resolution::SignedOut,
                    failure.or(Some(SessionError::UserNotFound)),
                )
            }
        }
    }

    /// Cached household, only if it is the one `user` references.
    fn cached_household_for(&self, user: &UserRecord) -> Option<HouseholdRecord> {
        let wanted = user.household_id.as_deref()?;
        let household = self.cache.read_household().unwrap_or_else(|err| {
            warn!("event=cache_read module=session status=error error={err}");
            None
        })?;
        (household.id == wanted).then_some(household)
    }
}
