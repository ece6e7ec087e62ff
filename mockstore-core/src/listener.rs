//! Ordered callback registries backing snapshot subscriptions.
//!
//! Both document and collection nodes own a [`CallbackRegistry`]. Callbacks
//! fire in registration order, and a panicking callback is isolated: it is
//! logged and the remaining callbacks still run, so one misbehaving listener
//! can never fail a mutation or starve its siblings.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

/// A shared, panic-opaque listener callback.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies one registration within a registry, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An ordered set of listener callbacks.
pub struct CallbackRegistry<T> {
    next_id: u64,
    entries: Vec<(ListenerId, Callback<T>)>,
}

impl<T> CallbackRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        CallbackRegistry {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Registers a callback and returns its id.
    ///
    /// Re-adding the same callback (the same `Arc`) is a no-op that returns
    /// the original id.
    pub fn add(&mut self, callback: Callback<T>) -> ListenerId {
        for (id, existing) in &self.entries {
            if Arc::ptr_eq(existing, &callback) {
                return *id;
            }
        }
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Removes a registration; returns whether it was present.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Drops every registration.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Invokes every callback in registration order with `value`.
    ///
    /// A panicking callback is caught and logged; later callbacks still run
    /// and the caller never observes the panic.
    pub fn fire(&self, value: &T) {
        for (id, callback) in &self.entries {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| (**callback)(value))) {
                warn!(
                    listener = id.0,
                    "listener panicked: {}",
                    panic
                        .downcast_ref::<&str>()
                        .copied()
                        .unwrap_or("(non-string panic)")
                );
            }
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        CallbackRegistry::new()
    }
}

impl<T> Clone for CallbackRegistry<T> {
    fn clone(&self) -> Self {
        CallbackRegistry {
            next_id: self.next_id,
            entries: self.entries.clone(),
        }
    }
}

impl<T> fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording(log: &Arc<Mutex<Vec<i32>>>, tag: i32) -> Callback<i32> {
        let log = Arc::clone(log);
        Arc::new(move |value: &i32| log.lock().unwrap().push(tag * 100 + value))
    }

    #[test]
    fn fires_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        registry.add(recording(&log, 1));
        registry.add(recording(&log, 2));

        registry.fire(&7);
        assert_eq!(*log.lock().unwrap(), [107, 207]);
    }

    #[test]
    fn re_adding_the_same_callback_is_a_no_op() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        let callback = recording(&log, 1);
        let first = registry.add(Arc::clone(&callback));
        let second = registry.add(callback);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        registry.fire(&1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn removal_stops_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        let id = registry.add(recording(&log, 1));
        registry.add(recording(&log, 2));

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        registry.fire(&0);
        assert_eq!(*log.lock().unwrap(), [200]);
    }

    #[test]
    fn a_panicking_callback_does_not_starve_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        registry.add(Arc::new(|_: &i32| panic!("listener bug")));
        registry.add(recording(&log, 2));

        registry.fire(&5);
        assert_eq!(*log.lock().unwrap(), [205]);
    }

    #[test]
    fn reset_clears_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        registry.add(recording(&log, 1));
        registry.reset();

        assert!(registry.is_empty());
        registry.fire(&1);
        assert!(log.lock().unwrap().is_empty());
    }
}
