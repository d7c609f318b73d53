//! Reactive state containers.
//!
//! [`Store`] is the single-instance state holder every other module
//! builds on: readers take snapshots, writers replace or update the
//! value in place, and subscribers are notified with a snapshot after
//! each change. Stores are constructed once per process and passed by
//! reference; there are no global singletons.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscriber<T> {
    id: u64,
    callback: Callback<T>,
}

struct Inner<T> {
    value: RwLock<T>,
    subscribers: RwLock<Vec<Subscriber<T>>>,
    next_id: AtomicU64,
}

/// A shared, observable value.
///
/// Cloning a `Store` clones the handle, not the value: all clones see
/// the same state and the same subscriber list.
pub struct Store<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a store holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(initial),
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        self.notify();
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        {
            let mut value = self.inner.value.write();
            f(&mut value);
        }
        self.notify();
    }

    /// Register `callback` to run with a snapshot after every change.
    /// Returns an id for [`Store::unsubscribe`].
    pub fn subscribe<F: Fn(&T) + Send + Sync + 'static>(&self, callback: F) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a subscriber registered with [`Store::subscribe`].
    pub fn unsubscribe(&self, id: u64) {
        self.inner.subscribers.write().retain(|s| s.id != id);
    }

    /// Run subscribers against a snapshot, outside both locks, so a
    /// callback may freely read or write the store it observes.
    fn notify(&self) {
        let snapshot = self.inner.value.read().clone();
        let callbacks: Vec<Callback<T>> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|s| Arc::clone(&s.callback))
            .collect();

        for callback in callbacks {
            callback(&snapshot);
        }
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_set_and_get() {
        let store = Store::new(1u32);
        store.set(5);
        assert_eq!(store.get(), 5);

        store.update(|v| *v += 1);
        assert_eq!(store.get(), 6);
    }

    #[test]
    fn test_subscribers_see_snapshots() {
        let store = Store::new(Vec::<i32>::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_handle = Arc::clone(&seen);
        store.subscribe(move |items| {
            seen_handle.store(items.len(), Ordering::SeqCst);
        });

        store.update(|items| items.push(1));
        store.update(|items| items.push(2));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = Store::new(0u32);
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_handle = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            calls_handle.fetch_add(1, Ordering::SeqCst);
        });

        store.set(1);
        store.unsubscribe(id);
        store.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_read_the_store() {
        let store = Store::new(7u32);
        let observed = Arc::new(AtomicUsize::new(0));

        let handle = store.clone();
        let observed_handle = Arc::clone(&observed);
        store.subscribe(move |_| {
            observed_handle.store(handle.get() as usize, Ordering::SeqCst);
        });

        store.set(42);
        assert_eq!(observed.load(Ordering::SeqCst), 42);
    }
}
