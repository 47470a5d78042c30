//! Background-task plumbing shared by the LLM-backed policies.
//!
//! Each policy spawns at most one task per key (character, session).
//! Results come home through an unbounded channel and are buffered
//! until the owning key polls again; cancelling aborts every task and
//! discards everything buffered.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// One in-flight task set keyed by `K`, yielding `T`.
pub(crate) struct TaskBroker<K, T> {
    tasks: JoinSet<()>,
    in_flight: BTreeSet<K>,
    tx: mpsc::UnboundedSender<(K, T)>,
    rx: mpsc::UnboundedReceiver<(K, T)>,
    ready: BTreeMap<K, T>,
}

impl<K: Ord + Clone + Send + 'static, T: Send + 'static> TaskBroker<K, T> {
    /// Create an empty broker.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tasks: JoinSet::new(),
            in_flight: BTreeSet::new(),
            tx,
            rx,
            ready: BTreeMap::new(),
        }
    }

    /// Whether a task for this key is still running.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.contains(key)
    }

    /// Spawn a task for `key`. The caller guarantees no task for this
    /// key is in flight.
    pub fn spawn<F>(&mut self, key: K, future: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.in_flight.insert(key.clone());
        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            let result = future.await;
            // The receiver only disappears on cancel; a failed send
            // means the result is being discarded on purpose.
            let _ = tx.send((key, result));
        });
    }

    /// Move completed results from the channel into the ready buffer.
    pub fn pump(&mut self) {
        while let Ok((key, result)) = self.rx.try_recv() {
            self.in_flight.remove(&key);
            self.ready.insert(key, result);
        }
    }

    /// Take the buffered result for `key`, if one has landed.
    pub fn take_ready(&mut self, key: &K) -> Option<T> {
        self.pump();
        self.ready.remove(key)
    }

    /// Drain every buffered result.
    pub fn drain_ready(&mut self) -> Vec<(K, T)> {
        self.pump();
        let drained: Vec<(K, T)> = std::mem::take(&mut self.ready).into_iter().collect();
        drained
    }

    /// Abort all tasks and discard buffered results.
    pub fn cancel_all(&mut self) {
        self.tasks.abort_all();
        self.in_flight.clear();
        self.ready.clear();
        while self.rx.try_recv().is_ok() {}
    }
}
