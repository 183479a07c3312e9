//! Bounded read-ahead prefetching of work items.
//!
//! Loading a trace extract is slow and the result is large, so the consumer
//! should find the next item already loaded, but the pipeline must not load
//! so far ahead that resident memory grows without bound.
//!
//! # Architecture
//!
//! - A single dispatcher task walks the work items in order and starts a
//!   worker for each one, holding back while `max_parallel` workers are
//!   active or while dispatch is `gap_threshold` items ahead of the
//!   consumer's read index.
//! - Workers run on the blocking pool and load every artifact accepted by
//!   the filter.
//! - Each item has a [`Slot`]. Fetching a slot publishes the consumer's read
//!   index first, then waits for the worker.
//!
//! # Usage
//!
//! ```ignore
//! let mut prefetched = Prefetcher::start(items, |_| true, PrefetchConfig::new())?;
//! while let Some(item) = prefetched.next().await {
//!     let item = item?;
//!     process(&item);
//!     // dropping the guard releases every artifact of the item
//! }
//! ```
//!
//! Items must be fetched in ascending order and released before the next
//! one is fetched; that is what keeps memory bounded.

mod dispatcher;
mod progress;
mod slot;
mod worker;

pub use slot::Slot;

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Handle;
use tracing::{Instrument, info_span};

use crate::config::PrefetchConfig;
use crate::error::{Error, Result};
use crate::model::WorkItem;
use dispatcher::Dispatcher;
use progress::Progress;
use worker::Job;

/// Entry point for starting a prefetch pipeline.
pub struct Prefetcher;

impl Prefetcher {
    /// Start prefetching `items` in order.
    ///
    /// Must be called from within a tokio runtime. The dispatcher starts
    /// immediately; the returned handle gives ordered access to the results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` has a zero limit.
    pub fn start<W, F>(items: Vec<W>, filter: F, config: PrefetchConfig) -> Result<Prefetched<W>>
    where
        W: WorkItem,
        F: Fn(&W::Artifact) -> bool + Send + Sync + 'static,
    {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| Error::Other(format!("prefetching needs a tokio runtime: {e}")))?;

        let progress = Arc::new(Progress::default());
        let mut slots = Vec::with_capacity(items.len());
        let mut pending = VecDeque::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let (slot, completion) = Slot::new(index, Arc::clone(&progress));
            slots.push(slot);
            pending.push_back(Job {
                index,
                item,
                completion,
            });
        }

        let dispatcher = Dispatcher::new(pending, Arc::new(filter), config, Arc::clone(&progress));
        runtime.spawn(dispatcher.run().instrument(info_span!("prefetch.dispatch")));

        Ok(Prefetched {
            slots,
            progress,
            config,
            runtime,
            next: AtomicUsize::new(0),
            cursor: 0,
        })
    }
}

/// Ordered, memoized access to prefetched work items.
///
/// Dropping this stops further dispatching; workers already running finish
/// and their results are discarded.
pub struct Prefetched<W> {
    slots: Vec<Slot<W>>,
    progress: Arc<Progress>,
    config: PrefetchConfig,
    runtime: Handle,
    /// One past the highest index the consumer has begun fetching.
    next: AtomicUsize,
    cursor: usize,
}

impl<W: WorkItem> std::fmt::Debug for Prefetched<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefetched")
            .field("len", &self.slots.len())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<W: WorkItem> Prefetched<W> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    /// All slots in input order, for inspecting readiness. Items are fetched
    /// through [`get`](Self::get) or [`next`](Self::next).
    ///
    /// ```compile_fail
    /// # async fn skip_ahead(p: &tracefetch::Prefetched<impl tracefetch::WorkItem>) {
    /// let _ = p.slots()[2].get().await;
    /// # }
    /// ```
    pub fn slots(&self) -> &[Slot<W>] {
        &self.slots
    }

    /// Fetch item `index`, waiting for its worker if needed.
    ///
    /// Any index already begun may be fetched again and returns the cached
    /// result. Skipping ahead of the next unfetched index is rejected with
    /// [`Error::OutOfOrder`], since the skipped items would stay loaded.
    pub async fn get(&self, index: usize) -> Result<Arc<W>> {
        self.claim(index)?;
        self.slots[index].get().await
    }

    /// Blocking variant of [`get`](Self::get) for consumers on plain threads.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async context.
    pub fn blocking_get(&self, index: usize) -> Result<Arc<W>> {
        self.runtime.block_on(self.get(index))
    }

    /// Fetch the next item in order, wrapped in a guard that releases its
    /// artifacts on drop. Returns `None` after the last item.
    ///
    /// Cancel safe: if the returned future is dropped before it completes,
    /// the cursor stays put and the next call fetches the same item again.
    pub async fn next(&mut self) -> Option<Result<Loaded<W>>> {
        let index = self.cursor;
        if index >= self.slots.len() {
            return None;
        }
        let result = self.get(index).await;
        // Only advance once the result is in hand, so a guard always exists
        // for every item the cursor has passed.
        self.cursor += 1;
        Some(result.map(|item| Loaded { index, item }))
    }

    /// Blocking variant of [`next`](Self::next).
    ///
    /// # Panics
    ///
    /// Panics if called from within an async context.
    pub fn blocking_next(&mut self) -> Option<Result<Loaded<W>>> {
        let runtime = self.runtime.clone();
        runtime.block_on(self.next())
    }

    pub fn stats(&self) -> PrefetchStats {
        PrefetchStats {
            items: self.slots.len(),
            started: self.progress.started(),
            read_index: self.progress.read_index(),
            in_flight: self.progress.in_flight(),
            peak_in_flight: self.progress.peak_in_flight(),
            completed: self.progress.completed(),
            dispatch_finished: self.progress.is_dispatch_finished(),
        }
    }

    /// Enforce the ascending-order contract for `index`.
    fn claim(&self, index: usize) -> Result<()> {
        let len = self.slots.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        let mut expected = self.next.load(Ordering::SeqCst);
        loop {
            if index < expected {
                return Ok(());
            }
            if index > expected {
                return Err(Error::OutOfOrder {
                    requested: index,
                    expected,
                });
            }
            match self.next.compare_exchange(
                expected,
                index + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => expected = actual,
            }
        }
    }
}

impl<W> Drop for Prefetched<W> {
    fn drop(&mut self) {
        self.progress.close();
    }
}

/// A loaded work item handed out by [`Prefetched::next`].
///
/// Releases every artifact of the item when dropped.
#[derive(Debug)]
pub struct Loaded<W: WorkItem> {
    index: usize,
    item: Arc<W>,
}

impl<W: WorkItem> Loaded<W> {
    /// Position of this item in the input order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Shared handle to the item. Artifacts are still released when this
    /// guard drops, even if the handle outlives it.
    pub fn item(&self) -> &Arc<W> {
        &self.item
    }
}

impl<W: WorkItem> Deref for Loaded<W> {
    type Target = W;

    fn deref(&self) -> &W {
        &self.item
    }
}

impl<W: WorkItem> Drop for Loaded<W> {
    fn drop(&mut self) {
        self.item.release_all();
    }
}

/// Point-in-time view of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchStats {
    /// Number of work items in the pipeline.
    pub items: usize,
    /// Items handed to a worker so far.
    pub started: usize,
    /// Highest index the consumer has begun fetching.
    pub read_index: usize,
    /// Workers currently loading.
    pub in_flight: usize,
    /// Highest `in_flight` observed.
    pub peak_in_flight: usize,
    /// Workers that finished, successfully or not.
    pub completed: usize,
    /// Whether the dispatcher has exited.
    pub dispatch_finished: bool,
}

impl PrefetchStats {
    /// How far dispatch currently runs ahead of the consumer.
    pub fn look_ahead(&self) -> usize {
        self.started.saturating_sub(self.read_index)
    }
}
