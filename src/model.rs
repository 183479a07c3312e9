//! Core data model.
//!
//! A work item is one unit moving through the prefetch pipeline (typically
//! one test with its trace extracts). Each artifact it owns is an expensive
//! payload that is loaded ahead of time and released by the consumer.

pub mod json;

pub use json::{ExtractSet, JsonExtract};

use crate::error::BoxError;

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// One loadable payload owned by a work item.
///
/// Implementations cache the payload internally. The pipeline calls
/// [`load`](Artifact::load) from a worker thread and never calls
/// [`release`](Artifact::release) itself; that is the consumer's job.
pub trait Artifact: Send + Sync + 'static {
    /// Load and cache the payload. Calls after the first successful one must
    /// return without loading again.
    fn load(&self) -> Result<(), BoxError>;

    /// Drop the cached payload. Must be a no-op for an artifact that was
    /// never loaded.
    fn release(&self);
}

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A unit of work with zero or more artifacts.
pub trait WorkItem: Send + Sync + 'static {
    type Artifact: Artifact;

    /// Artifacts in load order.
    fn artifacts(&self) -> &[Self::Artifact];

    /// Release every artifact of this item.
    fn release_all(&self) {
        for artifact in self.artifacts() {
            artifact.release();
        }
    }
}
