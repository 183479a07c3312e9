//! The dispatch loop: starts workers in order under both throttles.

use opentelemetry::KeyValue;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::progress::Progress;
use super::worker::{self, Job};
use crate::config::PrefetchConfig;
use crate::model::WorkItem;
use crate::telemetry::metrics;

/// Why the dispatcher is holding back the next item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Throttle {
    Parallelism,
    LookAhead,
}

impl Throttle {
    fn as_str(self) -> &'static str {
        match self {
            Throttle::Parallelism => "parallelism",
            Throttle::LookAhead => "look_ahead",
        }
    }
}

/// Owns the pending queue and the active set for one pipeline.
pub(crate) struct Dispatcher<W, F> {
    pending: VecDeque<Job<W>>,
    active: VecDeque<JoinHandle<()>>,
    filter: Arc<F>,
    config: PrefetchConfig,
    progress: Arc<Progress>,
}

impl<W, F> Dispatcher<W, F>
where
    W: WorkItem,
    F: Fn(&W::Artifact) -> bool + Send + Sync + 'static,
{
    pub(crate) fn new(
        pending: VecDeque<Job<W>>,
        filter: Arc<F>,
        config: PrefetchConfig,
        progress: Arc<Progress>,
    ) -> Self {
        Self {
            pending,
            active: VecDeque::with_capacity(config.max_parallel),
            filter,
            config,
            progress,
        }
    }

    /// Dispatch every pending job, then return. Workers already started keep
    /// running after this returns.
    pub(crate) async fn run(mut self) {
        let total = self.pending.len();
        info!(
            items = total,
            max_parallel = self.config.max_parallel,
            gap_threshold = self.config.gap_threshold,
            "dispatcher started"
        );

        while let Some(job) = self.pending.pop_front() {
            if !self.wait_for_capacity().await {
                debug!(
                    dispatched = self.progress.started(),
                    remaining = self.pending.len() + 1,
                    "consumer dropped, dispatcher stopping"
                );
                break;
            }

            debug!(index = job.index, "dispatching work item");
            let handle = worker::spawn(job, Arc::clone(&self.filter), Arc::clone(&self.progress));
            self.active.push_back(handle);
            self.progress.mark_started();
            metrics::items_dispatched().add(1, &[]);
        }

        self.progress.mark_dispatch_finished();
        info!(dispatched = self.progress.started(), items = total, "dispatcher finished");
    }

    /// Block until one more worker may start. Returns `false` if the
    /// consumer went away while waiting.
    async fn wait_for_capacity(&mut self) -> bool {
        loop {
            if self.progress.is_closed() {
                return false;
            }

            // Oldest first: a finished handle behind an unfinished one keeps
            // its slot until the front clears.
            while self.active.front().is_some_and(JoinHandle::is_finished) {
                self.active.pop_front();
            }

            let Some(throttle) = self.throttle() else {
                return true;
            };

            trace!(
                reason = throttle.as_str(),
                active = self.active.len(),
                started = self.progress.started(),
                read_index = self.progress.read_index(),
                "dispatch throttled"
            );
            metrics::dispatch_throttled().add(1, &[KeyValue::new("reason", throttle.as_str())]);

            let front_finished = match self.active.front_mut() {
                Some(front) => tokio::select! {
                    _ = front => true,
                    _ = self.progress.changed() => false,
                },
                None => {
                    self.progress.changed().await;
                    false
                }
            };
            if front_finished {
                self.active.pop_front();
            }
        }
    }

    /// The first limit that forbids starting another worker right now.
    fn throttle(&self) -> Option<Throttle> {
        if self.active.len() >= self.config.max_parallel {
            return Some(Throttle::Parallelism);
        }
        let ahead = self
            .progress
            .started()
            .saturating_sub(self.progress.read_index());
        if ahead >= self.config.gap_threshold {
            return Some(Throttle::LookAhead);
        }
        None
    }
}
