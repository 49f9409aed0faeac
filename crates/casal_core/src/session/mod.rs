//! Session reconciliation core.
//!
//! # Responsibility
//! - Own the single in-memory `SessionState` of the process.
//! - Reconcile provider notifications, remote records and the local cache.
//! - Broadcast every transition to registered observers.
//!
//! # Invariants
//! - Only the most recently started reconciliation may commit.
//! - Every committed state satisfies the `SessionState` invariants.

pub mod error;
mod fetch;
pub mod observer;
pub mod reconciler;

pub use error::{SessionError, SessionResult};
pub use observer::ObserverId;
pub use reconciler::SessionReconciler;
