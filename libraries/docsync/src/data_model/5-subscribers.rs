//! # Subscribers
//! A registry of typed listeners plus a queue of events that have not been delivered yet.
//!
//! Publishing only queues. Delivery happens in [`Subscribers::flush`], which takes the due notifications out
//! under the lock and then calls them with the lock released. Listeners are free to call back into whatever
//! published the event (including registering or unregistering listeners) without deadlocking.

use std::sync::Arc;

use parking_lot::Mutex;

use super::ListenerKey;

type Listener<E> = Arc<dyn Fn(ListenerKey, &E) + Send + Sync>;

struct Pending<E> {
    event: E,
    /// The listener that caused this event, if any. It is not notified.
    modifier: Option<ListenerKey>,
}

struct Inner<E> {
    listeners: slotmap::SlotMap<slotmap::DefaultKey, Listener<E>>,
    pending: Vec<Pending<E>>,
}

pub struct Subscribers<E> {
    inner: Mutex<Inner<E>>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                listeners: Default::default(),
                pending: Vec::new(),
            }),
        }
    }
}

impl<E: Clone + Send + 'static> Subscribers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: impl Fn(ListenerKey, &E) + Send + Sync + 'static) -> ListenerKey {
        let key = self.inner.lock().listeners.insert(Arc::new(listener));
        ListenerKey(key)
    }

    /// Returns false if the key was not registered.
    pub fn unregister(&self, key: ListenerKey) -> bool {
        self.inner.lock().listeners.remove(key.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn publish(&self, event: E, modifier: Option<ListenerKey>) {
        self.inner.lock().pending.push(Pending { event, modifier });
    }

    pub fn drain_due_notifications(&self) -> Vec<Box<dyn FnOnce() + Send>> {
        let mut inner = self.inner.lock();
        let pending = std::mem::take(&mut inner.pending);
        let mut notifications: Vec<Box<dyn FnOnce() + Send>> = Vec::new();
        for Pending { event, modifier } in pending {
            for (key, listener) in inner.listeners.iter() {
                let listener_key = ListenerKey(key);
                if modifier == Some(listener_key) {
                    continue;
                }
                let listener = listener.clone();
                let event = event.clone();
                notifications.push(Box::new(move || listener(listener_key, &event)));
            }
        }
        notifications
    }

    pub fn flush(&self) {
        // the lock is released by the time the listeners run
        let notifications = self.drain_due_notifications();
        for notification in notifications {
            notification();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_is_deferred_until_flush() {
        let subscribers = Subscribers::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        subscribers.register(move |_, event| sink.lock().push(*event));

        subscribers.publish(1, None);
        subscribers.publish(2, None);
        assert!(seen.lock().is_empty());

        subscribers.flush();
        assert_eq!(*seen.lock(), vec![1, 2]);

        subscribers.flush();
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_modifier_is_skipped() {
        let subscribers = Subscribers::<&'static str>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let modifier = subscribers.register(move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let c = count.clone();
        subscribers.register(move |_, _| {
            c.fetch_add(10, Ordering::SeqCst);
        });

        subscribers.publish("changed", Some(modifier));
        subscribers.flush();
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_unregistered_listener_is_not_called() {
        let subscribers = Subscribers::<u8>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let key = subscribers.register(move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(subscribers.unregister(key));
        assert!(!subscribers.unregister(key));
        subscribers.publish(0, None);
        subscribers.flush();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(subscribers.is_empty());
    }

    #[test]
    fn test_listener_can_reenter_registry() {
        let subscribers = Arc::new(Subscribers::<u8>::new());
        let registry = subscribers.clone();
        subscribers.register(move |key, _| {
            registry.unregister(key);
        });

        subscribers.publish(0, None);
        subscribers.flush();
        assert_eq!(subscribers.len(), 0);
    }
}
