//! Domain model for the session/identity core.
//!
//! # Responsibility
//! - Define the identity, user and household shapes the session is built from.
//! - Define household-scoped data records (categories).
//! - Define the exposed `SessionState` aggregate.
//!
//! # Invariants
//! - A session is authenticated iff both identity and user record are present.
//! - A household is attached only when the user's `household_id` names it.

pub mod category;
pub mod household;
pub mod identity;
pub mod session;
pub mod user;
