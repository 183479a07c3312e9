//! Error types for tracefetch.

use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by artifact collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors are `Clone` so a memoized slot can hand out the same failure
/// on every retrieval.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("failed to load artifact {artifact} of work item {index}: {source}")]
    Load {
        index: usize,
        artifact: usize,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("worker for work item {0} ended without reporting a result")]
    WorkerLost(usize),

    #[error("work item {requested} requested out of order, next expected is {expected}")]
    OutOfOrder { requested: usize, expected: usize },

    #[error("work item index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("json error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(Arc::new(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
