//! In-process reference backends.
//!
//! # Responsibility
//! - Implement `IdentityProvider` and `RecordStore` without any network.
//! - Let tests and the CLI inject transport failures.
//!
//! # Invariants
//! - Listeners are invoked outside of internal locks, in registration order.
//! - Injected failures surface as `Network` errors, like a real transport.

use crate::model::identity::Identity;
use crate::remote::document::Document;
use crate::remote::identity::{
    IdentityListener, IdentityProvider, ProviderError, ProviderResult, Subscription,
};
use crate::remote::records::{RecordKind, RecordStore, StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

struct Account {
    identity: Identity,
    secret: String,
}

#[derive(Default)]
struct ProviderInner {
    accounts: Mutex<BTreeMap<String, Account>>,
    current: Mutex<Option<Identity>>,
    listeners: Mutex<BTreeMap<u64, IdentityListener>>,
    next_listener_id: AtomicU64,
    next_uid: AtomicU64,
    offline: AtomicBool,
}

impl ProviderInner {
    fn notify(&self, identity: Option<Identity>) {
        let listeners = self.listeners.lock().values().cloned().collect::<Vec<_>>();
        for listener in listeners {
            listener(identity.clone());
        }
    }

    fn ensure_online(&self) -> ProviderResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::Network("provider offline".to_string()));
        }
        Ok(())
    }
}

/// Identity provider keeping accounts in memory.
///
/// `login`, `create_account` and `sign_out` notify listeners synchronously on
/// the calling thread, the way a hosted provider eventually would.
#[derive(Default, Clone)]
pub struct MemoryIdentityProvider {
    inner: Arc<ProviderInner>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account without signing it in or notifying.
    pub fn register_account(&self, email: &str, secret: &str) -> Identity {
        let identity = self.next_identity(email);
        self.inner.accounts.lock().insert(
            normalize_email(email),
            Account {
                identity: identity.clone(),
                secret: secret.to_string(),
            },
        );
        identity
    }

    /// Simulates a provider-side identity change notification.
    pub fn emit(&self, identity: Option<Identity>) {
        *self.inner.current.lock() = identity.clone();
        self.inner.notify(identity);
    }

    /// Makes the provider restore `identity` at startup without notifying.
    pub fn set_current(&self, identity: Option<Identity>) {
        *self.inner.current.lock() = identity;
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn next_identity(&self, email: &str) -> Identity {
        let n = self.inner.next_uid.fetch_add(1, Ordering::SeqCst) + 1;
        Identity::new(format!("uid-{n}"), email.trim())
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn subscribe(&self, listener: IdentityListener) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().insert(id, listener);
        let weak: Weak<ProviderInner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.lock().remove(&id);
            }
        })
    }

    fn current_identity(&self) -> Option<Identity> {
        self.inner.current.lock().clone()
    }

    fn login(&self, email: &str, secret: &str) -> ProviderResult<Identity> {
        self.inner.ensure_online()?;
        let identity = {
            let accounts = self.inner.accounts.lock();
            let account = accounts
                .get(&normalize_email(email))
                .ok_or(ProviderError::UserNotFound)?;
            if account.secret != secret {
                return Err(ProviderError::InvalidCredentials);
            }
            account.identity.clone()
        };
        self.emit(Some(identity.clone()));
        Ok(identity)
    }

    fn create_account(&self, email: &str, secret: &str) -> ProviderResult<Identity> {
        self.inner.ensure_online()?;
        if self
            .inner
            .accounts
            .lock()
            .contains_key(&normalize_email(email))
        {
            return Err(ProviderError::EmailAlreadyInUse);
        }
        let identity = self.register_account(email, secret);
        self.emit(Some(identity.clone()));
        Ok(identity)
    }

    fn sign_out(&self) -> ProviderResult<()> {
        self.inner.ensure_online()?;
        self.emit(None);
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Document store keeping records in memory.
#[derive(Default)]
pub struct MemoryRecordStore {
    documents: Mutex<BTreeMap<(RecordKind, String), Document>>,
    failing_reads: AtomicU32,
    offline: AtomicBool,
    read_count: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces one document without going through failure injection.
    pub fn insert(&self, kind: RecordKind, id: &str, document: Document) {
        self.documents.lock().insert((kind, id.to_string()), document);
    }

    pub fn remove(&self, kind: RecordKind, id: &str) {
        self.documents.lock().remove(&(kind, id.to_string()));
    }

    pub fn document(&self, kind: RecordKind, id: &str) -> Option<Document> {
        self.documents.lock().get(&(kind, id.to_string())).cloned()
    }

    /// Makes the next `count` reads fail with a network error.
    pub fn fail_next_reads(&self, count: u32) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Makes every read and write fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get_record` calls seen, failed ones included.
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("record store offline".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn get_record(&self, kind: RecordKind, id: &str) -> StoreResult<Option<Document>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        let injected = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Network("injected read failure".to_string()));
        }
        Ok(self.document(kind, id))
    }

    fn set_record(&self, kind: RecordKind, id: &str, fields: Document) -> StoreResult<()> {
        self.ensure_online()?;
        self.insert(kind, id, fields);
        Ok(())
    }

    fn update_record(
        &self,
        kind: RecordKind,
        id: &str,
        partial_fields: Document,
    ) -> StoreResult<()> {
        self.ensure_online()?;
        let mut documents = self.documents.lock();
        let document = documents
            .get_mut(&(kind, id.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
            })?;
        for (field, value) in partial_fields {
            document.insert(field, value);
        }
        Ok(())
    }

    fn query_records(
        &self,
        kind: RecordKind,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<(String, Document)>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        let matches = self
            .documents
            .lock()
            .iter()
            .filter(|((doc_kind, _), document)| {
                *doc_kind == kind && document.get(field).and_then(|v| v.as_str()) == Some(value)
            })
            .map(|((_, id), document)| (id.clone(), document.clone()))
            .collect();
        Ok(matches)
    }
}
