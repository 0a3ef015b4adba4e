//! # Listener Registry
//!
//! A small callback registry used to push session changes outward. Both
//! gateways use it to publish auth changes, and the session tracker uses it to
//! relay deduplicated changes to the view layer.
//!
//! Registration hands back a [`Subscription`]. Calling
//! [`Subscription::unsubscribe`] (or dropping the handle) removes the listener;
//! once that returns, the listener is never invoked again, including for an
//! emission that is already in progress.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    next_id: u64,
    listeners: BTreeMap<u64, Listener<T>>,
}

pub struct ListenerRegistry<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T: 'static> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                listeners: BTreeMap::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id = inner.next_id.saturating_add(1);
            inner.listeners.insert(id, Arc::new(listener));
            id
        };

        let registry = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = registry.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        })
    }

    /// Invokes every registered listener in registration order.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(u64, Listener<T>)> = lock(&self.inner)
            .listeners
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            // Listeners may unsubscribe each other mid-emission.
            let registered = lock(&self.inner).listeners.contains_key(&id);
            if registered {
                listener(value);
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by a registry; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Removes the listener. Calling it more than once is harmless.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Locks a mutex, recovering the data if a listener panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&u32) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move |_: &u32| {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_reaches_all_listeners() {
        let registry = ListenerRegistry::new();
        let (a, listener_a) = counter();
        let (b, listener_b) = counter();
        let _sa = registry.subscribe(listener_a);
        let _sb = registry.subscribe(listener_b);

        registry.emit(&1);
        registry.emit(&2);

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let registry = ListenerRegistry::new();
        let (count, listener) = counter();
        let mut sub = registry.subscribe(listener);

        registry.emit(&1);
        sub.unsubscribe();
        sub.unsubscribe();
        registry.emit(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!sub.is_active());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let registry = ListenerRegistry::new();
        let (count, listener) = counter();
        {
            let _sub = registry.subscribe(listener);
            assert_eq!(registry.len(), 1);
        }
        registry.emit(&1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_removed_mid_emission_is_skipped() {
        let registry = ListenerRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim_slot = Arc::clone(&slot);
        let _first = registry.subscribe(move |_: &u32| {
            victim_slot.lock().unwrap().take();
        });

        let (count, listener) = counter();
        *slot.lock().unwrap() = Some(registry.subscribe(listener));

        registry.emit(&1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_subscription_outliving_registry_is_harmless() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new();
        let mut sub = registry.subscribe(|_| {});
        drop(registry);
        sub.unsubscribe();
    }
}
