// ============================================================================
// Signals - Multi-subscriber notification sinks
// ============================================================================
//
// A `Signal<T>` keeps a list of slots. `emit` calls every slot with a shared
// reference to the payload. Subscribers get a `Connection` they can use to
// detach themselves; the connection only holds a weak reference to the
// signal, so it never keeps the emitter alive.
//
// Emission snapshots the slot list and calls the slots outside the lock,
// which lets a slot disconnect itself (or others) while being called.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    slots: Mutex<Vec<(u64, Slot<T>)>>,
    next_id: AtomicU64,
}

/// Type-erased slot removal, used by `Connection`
trait SlotRegistry: Send + Sync {
    fn remove(&self, id: u64) -> bool;
    fn contains(&self, id: u64) -> bool;
}

impl<T: 'static> SlotRegistry for SignalInner<T> {
    fn remove(&self, id: u64) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.slots.lock().iter().any(|(slot_id, _)| *slot_id == id)
    }
}

/// Notification sink with any number of subscribers
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                slots: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe `slot` to this signal
    pub fn connect<F>(&self, slot: F) -> Connection
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.slots.lock().push((id, Arc::new(slot)));

        let registry: Arc<dyn SlotRegistry> = self.inner.clone();
        Connection {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    /// Call every connected slot, in connection order
    pub fn emit(&self, value: &T) {
        let slots: Vec<Slot<T>> = self
            .inner
            .slots
            .lock()
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();

        for slot in slots {
            slot(value);
        }
    }

    /// Number of connected slots
    pub fn slot_count(&self) -> usize {
        self.inner.slots.lock().len()
    }

    pub fn disconnect_all(&self) {
        self.inner.slots.lock().clear();
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle to a single signal subscription
///
/// Dropping a connection does not disconnect it; call `disconnect`.
pub struct Connection {
    id: u64,
    registry: Weak<dyn SlotRegistry>,
}

impl Connection {
    /// Detach the slot. Safe to call more than once, and after the signal
    /// itself is gone.
    pub fn disconnect(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }

    /// Whether the slot is still attached to a live signal
    pub fn is_connected(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.contains(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_all_slots_in_order() {
        let signal: Signal<u32> = Signal::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = Arc::clone(&seen);
        let _c1 = signal.connect(move |v| s1.lock().push(("a", *v)));
        let s2 = Arc::clone(&seen);
        let _c2 = signal.connect(move |v| s2.lock().push(("b", *v)));

        signal.emit(&7);

        assert_eq!(*seen.lock(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let signal: Signal<()> = Signal::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let connection = signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(connection.is_connected());
        signal.emit(&());
        assert!(connection.disconnect());
        assert!(!connection.disconnect());
        assert!(!connection.is_connected());
        signal.emit(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.slot_count(), 0);
    }

    #[test]
    fn test_connection_outlives_signal() {
        let signal: Signal<i32> = Signal::new();
        let connection = signal.connect(|_| {});
        drop(signal);
        assert!(!connection.is_connected());
        assert!(!connection.disconnect());
    }

    #[test]
    fn test_clones_share_slots() {
        let signal: Signal<i32> = Signal::new();
        let clone = signal.clone();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let _connection = clone.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(&1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        signal.disconnect_all();
        assert_eq!(clone.slot_count(), 0);
    }
}
