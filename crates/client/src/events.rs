//! Subscription lists for store change notifications.
//!
//! Stores own a [`Listeners`] and call [`Listeners::notify`] after a change
//! has been applied. Callbacks run synchronously on the notifying thread,
//! outside of any store lock, so a listener may read the store it was
//! notified by.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned by [`Listeners::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An ordered list of callbacks interested in events of type `E`.
pub struct Listeners<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Callback<E>)>>,
}

impl<E> Listeners<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback. Callbacks are invoked in subscription order.
    pub fn subscribe(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Invoke every registered callback with `event`.
    pub fn notify(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self
            .entries()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Callback<E>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.len())
            .finish()
    }
}
