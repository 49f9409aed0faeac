//! Remote collaborators of the session core.
//!
//! # Responsibility
//! - Define the identity provider and record store contracts.
//! - Validate remote documents into typed records at the fetch boundary.
//! - Ship in-memory reference backends for tests and local runs.
//!
//! # Invariants
//! - Provider/store internals stay behind these traits; the core never
//!   depends on a concrete backend.

pub mod document;
pub mod identity;
pub mod memory;
pub mod records;

pub use document::{
    category_document, decode_category, decode_household, decode_user, household_document,
    user_document, Document, RecordError,
};
pub use identity::{IdentityListener, IdentityProvider, ProviderError, ProviderResult, Subscription};
pub use records::{RecordKind, RecordStore, StoreError, StoreResult};
