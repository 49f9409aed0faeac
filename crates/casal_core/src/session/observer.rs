//! Observer list for session transitions.

use crate::model::session::SessionState;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by `SessionReconciler::observe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&SessionState) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Observer)>>,
}

impl ObserverList {
    pub(crate) fn add(&self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.lock().push((id, observer));
        id
    }

    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Calls every current observer in registration order.
    ///
    /// The list is copied first so observers may (un)register re-entrantly.
    pub(crate) fn notify(&self, state: &SessionState) {
        let observers = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect::<Vec<_>>();
        for observer in observers {
            observer(state);
        }
    }
}
