//! # tracefetch
//!
//! Bounded read-ahead prefetching for large trace extracts that are consumed
//! one after another.
//!
//! Work items are loaded by background workers ahead of the consumer, limited
//! both in how many load at once and in how far loading may run ahead of
//! consumption.

pub mod config;
pub mod error;
pub mod model;
pub mod prefetch;
pub mod telemetry;

pub use config::PrefetchConfig;
pub use error::{Error, Result};
pub use model::{Artifact, WorkItem};
pub use prefetch::{Loaded, PrefetchStats, Prefetched, Prefetcher, Slot};
