//! Handler traits and per-category handler lists.
//!
//! Each event category owns one [`HandlerList`]. Lists support append,
//! removal by handler identity, and an atomic snapshot read used for
//! dispatch. Snapshot isolation means concurrent registration changes never
//! corrupt an in-flight fan-out: a handler removed mid-dispatch may still
//! receive the in-flight event, but iteration itself is always over a
//! consistent copy.

use std::sync::{Arc, RwLock};

/// A consumer of events of type `E`.
///
/// Implementations must be callable from many threads at once; the dispatcher
/// gives no exclusivity guarantees. Delivery happens off the producer's call
/// stack, so a slow handler delays its own category's queue, never the
/// producer.
pub trait EventHandler<E>: Send + Sync {
    /// Deliver one event.
    fn accept(&self, event: &E);

    /// Reports whether this handler transitively wraps `candidate`.
    ///
    /// Filtering decorators override this so removal by the original handler's
    /// identity unwraps arbitrarily nested wrappers. Plain handlers wrap
    /// nothing.
    fn wraps(&self, _candidate: &Arc<dyn EventHandler<E>>) -> bool {
        false
    }
}

/// Ordered collection of handlers for one event category.
pub struct HandlerList<E> {
    handlers: RwLock<Vec<Arc<dyn EventHandler<E>>>>,
}

impl<E> HandlerList<E> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Append a handler.
    ///
    /// Appending the same handler twice yields duplicate delivery; dedup is
    /// the caller's responsibility.
    pub fn append(&self, handler: Arc<dyn EventHandler<E>>) {
        self.handlers
            .write()
            .expect("handler list lock poisoned")
            .push(handler);
    }

    /// Remove every entry that is, or transitively wraps, `candidate`.
    ///
    /// Returns the number of entries removed.
    pub fn remove(&self, candidate: &Arc<dyn EventHandler<E>>) -> usize {
        let mut guard = self.handlers.write().expect("handler list lock poisoned");
        let before = guard.len();
        guard.retain(|entry| !Arc::ptr_eq(entry, candidate) && !entry.wraps(candidate));
        before - guard.len()
    }

    /// Atomic snapshot of the current handlers.
    ///
    /// Dispatch iterates the snapshot, so concurrent append/remove never
    /// invalidates an in-flight fan-out.
    pub fn snapshot(&self) -> Vec<Arc<dyn EventHandler<E>>> {
        self.handlers
            .read()
            .expect("handler list lock poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .expect("handler list lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for HandlerList<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u32>>,
    }

    impl EventHandler<u32> for Recorder {
        fn accept(&self, event: &u32) {
            self.seen.lock().unwrap().push(*event);
        }
    }

    /// Wrapper that forwards everything; used to test unwrap-on-remove.
    struct Passthrough {
        inner: Arc<dyn EventHandler<u32>>,
    }

    impl EventHandler<u32> for Passthrough {
        fn accept(&self, event: &u32) {
            self.inner.accept(event);
        }

        fn wraps(&self, candidate: &Arc<dyn EventHandler<u32>>) -> bool {
            Arc::ptr_eq(&self.inner, candidate) || self.inner.wraps(candidate)
        }
    }

    #[test]
    fn test_append_and_snapshot() {
        let list = HandlerList::new();
        let recorder = Arc::new(Recorder::default());
        list.append(recorder.clone() as Arc<dyn EventHandler<u32>>);
        assert_eq!(list.len(), 1);

        for h in list.snapshot() {
            h.accept(&7);
        }
        assert_eq!(recorder.seen.lock().unwrap().as_slice(), &[7]);
    }

    #[test]
    fn test_duplicate_append_delivers_twice() {
        let list = HandlerList::new();
        let recorder = Arc::new(Recorder::default());
        let handler: Arc<dyn EventHandler<u32>> = recorder.clone();
        list.append(handler.clone());
        list.append(handler);
        for h in list.snapshot() {
            h.accept(&1);
        }
        assert_eq!(recorder.seen.lock().unwrap().as_slice(), &[1, 1]);
    }

    #[test]
    fn test_remove_by_identity() {
        let list = HandlerList::new();
        let a: Arc<dyn EventHandler<u32>> = Arc::new(Recorder::default());
        let b: Arc<dyn EventHandler<u32>> = Arc::new(Recorder::default());
        list.append(a.clone());
        list.append(b.clone());

        assert_eq!(list.remove(&a), 1);
        assert_eq!(list.len(), 1);
        // Removing again is a no-op.
        assert_eq!(list.remove(&a), 0);
    }

    #[test]
    fn test_remove_unwraps_nested_decorators() {
        let list = HandlerList::new();
        let original: Arc<dyn EventHandler<u32>> = Arc::new(Recorder::default());
        let wrapped: Arc<dyn EventHandler<u32>> = Arc::new(Passthrough {
            inner: Arc::new(Passthrough {
                inner: original.clone(),
            }),
        });
        list.append(wrapped);

        // Removal by the original handler's identity must see through both
        // wrapper layers.
        assert_eq!(list.remove(&original), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_leaves_unrelated_wrappers() {
        let list = HandlerList::new();
        let original: Arc<dyn EventHandler<u32>> = Arc::new(Recorder::default());
        let other: Arc<dyn EventHandler<u32>> = Arc::new(Recorder::default());
        list.append(Arc::new(Passthrough {
            inner: original.clone(),
        }));

        assert_eq!(list.remove(&other), 0);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_snapshot_isolated_from_mutation() {
        let list = HandlerList::new();
        let recorder = Arc::new(Recorder::default());
        let handler: Arc<dyn EventHandler<u32>> = recorder.clone();
        list.append(handler.clone());

        let snapshot = list.snapshot();
        list.remove(&handler);
        assert!(list.is_empty());

        // The pre-removal snapshot still delivers.
        for h in snapshot {
            h.accept(&9);
        }
        assert_eq!(recorder.seen.lock().unwrap().as_slice(), &[9]);
    }
}
