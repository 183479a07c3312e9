//! Memoized per-index accessor for a prefetched work item.

use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, oneshot};
use tracing::trace;

use super::progress::Progress;
use crate::error::{Error, Result};

/// What a worker hands to its slot.
pub(crate) type Outcome<W> = Result<Arc<W>>;

/// Sending half given to the worker for one index.
pub(crate) type Completion<W> = oneshot::Sender<Outcome<W>>;

/// The eventual result of loading one work item.
///
/// Written once by its worker, read by the consumer through
/// [`Prefetched`](super::Prefetched). The first fetch waits; every later one
/// returns the cached item or error.
pub struct Slot<W> {
    index: usize,
    progress: Arc<Progress>,
    receiver: Mutex<oneshot::Receiver<Outcome<W>>>,
    outcome: OnceCell<Outcome<W>>,
}

impl<W> std::fmt::Debug for Slot<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("index", &self.index)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl<W> Slot<W> {
    pub(crate) fn new(index: usize, progress: Arc<Progress>) -> (Self, Completion<W>) {
        let (sender, receiver) = oneshot::channel();
        let slot = Self {
            index,
            progress,
            receiver: Mutex::new(receiver),
            outcome: OnceCell::new(),
        };
        (slot, sender)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether a result (item or error) has already been retrieved and cached.
    pub fn is_ready(&self) -> bool {
        self.outcome.initialized()
    }

    /// Publish this index as the consumer's read position, then wait for the
    /// worker to finish.
    ///
    /// The caller must have checked the ascending-order contract first.
    pub(crate) async fn get(&self) -> Result<Arc<W>> {
        // Published before waiting so the dispatcher throttles on where the
        // consumer actually is.
        self.progress.publish_read(self.index);

        let index = self.index;
        let outcome = self
            .outcome
            .get_or_init(|| async {
                trace!(index, "waiting for prefetched work item");
                let mut receiver = self.receiver.lock().await;
                match (&mut *receiver).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::WorkerLost(index)),
                }
            })
            .await;
        outcome.clone()
    }
}
