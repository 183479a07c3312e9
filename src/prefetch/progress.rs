//! Counters shared between the dispatcher, workers and the consumer.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Shared pipeline progress.
///
/// `read_index` and `started` drive the look-ahead throttle. The in-flight
/// counters are bookkeeping for [`PrefetchStats`](super::PrefetchStats).
#[derive(Debug, Default)]
pub(crate) struct Progress {
    read_index: AtomicUsize,
    started: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completed: AtomicUsize,
    dispatch_finished: AtomicBool,
    closed: AtomicBool,
    /// Wakes the dispatcher when the consumer advances or goes away.
    changed: Notify,
}

impl Progress {
    pub(crate) fn read_index(&self) -> usize {
        self.read_index.load(Ordering::SeqCst)
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub(crate) fn is_dispatch_finished(&self) -> bool {
        self.dispatch_finished.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Record that the consumer has begun fetching `index`. Never moves
    /// backwards.
    pub(crate) fn publish_read(&self, index: usize) {
        let previous = self.read_index.fetch_max(index, Ordering::SeqCst);
        if index > previous {
            self.changed.notify_one();
        }
    }

    pub(crate) fn mark_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn mark_load_started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    pub(crate) fn mark_load_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn mark_dispatch_finished(&self) {
        self.dispatch_finished.store(true, Ordering::SeqCst);
    }

    /// The consumer is gone; the dispatcher should stop at its next check.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.changed.notify_one();
    }

    /// Resolves after the next `publish_read` advance or `close`.
    ///
    /// A notification sent while nobody waits is kept, so a change between
    /// the dispatcher's check and its wait is not lost.
    pub(crate) async fn changed(&self) {
        self.changed.notified().await;
    }
}
