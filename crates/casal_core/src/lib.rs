//! Session and identity core for the household-finance client.
//! This crate is the single source of truth for "who is signed in and which
//! household they belong to".

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;
pub mod session;

pub use cache::{CacheError, CacheResult, LocalCacheStore, SessionCache, SqliteCacheStore};
pub use config::{ConfigError, SessionConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{CategoryRecord, CategoryValidationError};
pub use model::household::{HouseholdId, HouseholdRecord, HouseholdValidationError};
pub use model::identity::Identity;
pub use model::session::{
    AuthenticatedSession, Freshness, SessionInvariantError, SessionPhase, SessionState,
};
pub use model::user::{UserRecord, UserValidationError};
pub use remote::memory::{MemoryIdentityProvider, MemoryRecordStore};
pub use remote::{
    Document, IdentityListener, IdentityProvider, ProviderError, ProviderResult, RecordError,
    RecordKind, RecordStore, StoreError, StoreResult, Subscription,
};
pub use service::account_service::{AccountService, SignUpRequest};
pub use service::category_service::CategoryService;
pub use service::household_service::HouseholdService;
pub use session::{ObserverId, SessionError, SessionReconciler, SessionResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
