//! Subscriber fan-out.
//!
//! A [`Publisher`] holds callbacks keyed by a monotonically assigned
//! subscriber id. Publication invokes callbacks synchronously in id
//! order; callbacks must not re-enter the engine. Unsubscribing is
//! idempotent: cancelling a [`Subscription`] twice has no additional
//! effect.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

/// Callback type for one publisher.
type Callback<T> = Box<dyn Fn(&T) + Send>;

/// Shared callback registry.
struct Registry<T> {
    /// Callbacks keyed by subscriber id.
    subscribers: Mutex<BTreeMap<u64, Callback<T>>>,
    /// Next subscriber id.
    next_id: AtomicU64,
}

/// A synchronous fan-out channel for one event type.
pub struct Publisher<T> {
    registry: Arc<Registry<T>>,
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Publisher<T> {
    /// Create an empty publisher.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a callback; returns its cancellation handle.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + 'static) -> Subscription<T> {
        let id = self.registry.next_id.fetch_add(1, Ordering::AcqRel);
        match self.registry.subscribers.lock() {
            Ok(mut subs) => {
                subs.insert(id, Box::new(callback));
            }
            Err(_poisoned) => warn!("publisher lock poisoned during subscribe"),
        }
        Subscription {
            registry: Arc::clone(&self.registry),
            id,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Deliver one event to every subscriber, in subscription order.
    pub fn publish(&self, event: &T) {
        match self.registry.subscribers.lock() {
            Ok(subs) => {
                for callback in subs.values() {
                    callback(event);
                }
            }
            Err(_poisoned) => warn!("publisher lock poisoned during publish"),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .subscribers
            .lock()
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

/// Handle returned by [`Publisher::subscribe`].
///
/// Dropping the handle does **not** unsubscribe; call
/// [`Subscription::cancel`]. Cancelling twice is a no-op.
pub struct Subscription<T> {
    registry: Arc<Registry<T>>,
    id: u64,
    cancelled: AtomicBool,
}

impl<T> Subscription<T> {
    /// Remove the callback from the publisher. Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut subs) = self.registry.subscribers.lock() {
            subs.remove(&self.id);
        }
    }

    /// Whether this subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn publish_reaches_all_subscribers() {
        let publisher: Publisher<u32> = Publisher::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&count);
        let _s1 = publisher.subscribe(move |v| {
            c1.fetch_add(*v as usize, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&count);
        let _s2 = publisher.subscribe(move |v| {
            c2.fetch_add(*v as usize, Ordering::SeqCst);
        });

        publisher.publish(&5);
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert_eq!(publisher.subscriber_count(), 2);
    }

    #[test]
    fn cancel_is_idempotent() {
        let publisher: Publisher<u32> = Publisher::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let sub = publisher.subscribe(move |_v| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(publisher.subscriber_count(), 1);

        sub.cancel();
        sub.cancel();
        assert!(sub.is_cancelled());
        assert_eq!(publisher.subscriber_count(), 0);

        publisher.publish(&1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn delivery_is_fifo_per_subscriber() {
        let publisher: Publisher<u32> = Publisher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        let _sub = publisher.subscribe(move |v| {
            s.lock().unwrap().push(*v);
        });

        for v in 0..5 {
            publisher.publish(&v);
        }
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
