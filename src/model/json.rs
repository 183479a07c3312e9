//! JSON-file backed artifacts.

use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

use super::{Artifact, WorkItem};
use crate::error::{BoxError, Result};

/// A trace extract stored as a JSON file, deserialized on first load.
///
/// The payload stays cached until [`Artifact::release`] is called.
pub struct JsonExtract<T> {
    path: PathBuf,
    payload: Mutex<Option<Arc<T>>>,
}

impl<T> std::fmt::Debug for JsonExtract<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonExtract")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<T> JsonExtract<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            payload: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    /// The cached payload, if loaded and not yet released.
    pub fn payload(&self) -> Option<Arc<T>> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        self.payload.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: DeserializeOwned> JsonExtract<T> {
    /// The payload, deserializing the file first if needed.
    pub fn extract(&self) -> Result<Arc<T>> {
        // The lock is held across deserialization so concurrent callers
        // never parse the same file twice.
        let mut payload = self.lock();
        if let Some(cached) = payload.as_ref() {
            return Ok(Arc::clone(cached));
        }

        trace!(path = %self.path.display(), "deserializing extract");
        let reader = BufReader::new(File::open(&self.path)?);
        let parsed: Arc<T> = Arc::new(serde_json::from_reader(reader)?);
        *payload = Some(Arc::clone(&parsed));
        Ok(parsed)
    }

    /// [`extract`](Self::extract) for callers on an async worker thread.
    ///
    /// A cached payload is returned directly. Otherwise the file is read and
    /// parsed under [`tokio::task::block_in_place`], so other tasks move to
    /// another worker meanwhile.
    ///
    /// # Panics
    ///
    /// Panics on a current-thread runtime when the payload is not cached.
    pub fn extract_in_place(&self) -> Result<Arc<T>> {
        if let Some(cached) = self.payload() {
            return Ok(cached);
        }
        tokio::task::block_in_place(|| self.extract())
    }
}

impl<T> Artifact for JsonExtract<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn load(&self) -> std::result::Result<(), BoxError> {
        self.extract()?;
        Ok(())
    }

    fn release(&self) {
        if self.lock().take().is_some() {
            debug!(path = %self.path.display(), "extract released");
        }
    }
}

/// A named group of extracts that belong to one test.
#[derive(Debug)]
pub struct ExtractSet<T> {
    name: String,
    files: Vec<JsonExtract<T>>,
}

impl<T> ExtractSet<T> {
    pub fn new<P: Into<PathBuf>>(name: impl Into<String>, files: impl IntoIterator<Item = P>) -> Self {
        Self {
            name: name.into(),
            files: files.into_iter().map(JsonExtract::new).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[JsonExtract<T>] {
        &self.files
    }
}

impl<T> WorkItem for ExtractSet<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Artifact = JsonExtract<T>;

    fn artifacts(&self) -> &[JsonExtract<T>] {
        &self.files
    }
}
