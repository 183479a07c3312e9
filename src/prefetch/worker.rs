//! Loads the accepted artifacts of one work item on the blocking pool.

use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::progress::Progress;
use super::slot::{Completion, Outcome};
use crate::error::Error;
use crate::model::{Artifact, WorkItem};
use crate::telemetry::metrics;
use crate::telemetry::prefetch::{record_outcome, start_load_span};

/// A dispatched unit: the item, its position and where to report.
pub(crate) struct Job<W> {
    pub(crate) index: usize,
    pub(crate) item: W,
    pub(crate) completion: Completion<W>,
}

/// Keeps the in-flight counter honest even if a load panics.
struct InFlight<'a>(&'a Progress);

impl<'a> InFlight<'a> {
    fn enter(progress: &'a Progress) -> Self {
        progress.mark_load_started();
        Self(progress)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.mark_load_finished();
    }
}

/// Start loading `job` on the runtime's blocking pool.
pub(crate) fn spawn<W, F>(job: Job<W>, filter: Arc<F>, progress: Arc<Progress>) -> JoinHandle<()>
where
    W: WorkItem,
    F: Fn(&W::Artifact) -> bool + Send + Sync + 'static,
{
    let Job {
        index,
        item,
        completion,
    } = job;
    let span = start_load_span(index, item.artifacts().len());

    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        let outcome = {
            let _in_flight = InFlight::enter(&progress);
            let started_at = Instant::now();
            let outcome = load(index, item, filter.as_ref());
            let result = if outcome.is_ok() { "ok" } else { "error" };
            record_outcome(&span, result);
            metrics::load_duration_ms().record(
                started_at.elapsed().as_secs_f64() * 1000.0,
                &[KeyValue::new("result", result)],
            );
            metrics::items_loaded().add(1, &[KeyValue::new("result", result)]);
            outcome
        };

        if completion.send(outcome).is_err() {
            debug!(index, "consumer dropped before work item finished loading");
        }
    })
}

/// Load every accepted artifact in order. On failure, artifacts this call
/// already loaded are released again before the error is returned.
fn load<W, F>(index: usize, item: W, filter: &F) -> Outcome<W>
where
    W: WorkItem,
    F: Fn(&W::Artifact) -> bool,
{
    let mut loaded: Vec<&W::Artifact> = Vec::new();
    for (position, artifact) in item.artifacts().iter().enumerate() {
        if !filter(artifact) {
            continue;
        }
        if let Err(source) = artifact.load() {
            warn!(index, artifact = position, error = %source, "artifact load failed");
            for done in loaded {
                done.release();
            }
            return Err(Error::Load {
                index,
                artifact: position,
                source: Arc::from(source),
            });
        }
        loaded.push(artifact);
    }

    debug!(index, artifacts = loaded.len(), "work item loaded");
    Ok(Arc::new(item))
}
