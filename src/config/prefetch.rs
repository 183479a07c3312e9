//! Prefetch pipeline tuning.

use serde::{Deserialize, Serialize};

use super::optional_usize;
use crate::error::{Error, Result};

/// Default cap on simultaneously loading work items.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Default cap on how far dispatch may run ahead of the consumer.
pub const DEFAULT_GAP_THRESHOLD: usize = 10;

/// Throttles for the prefetch dispatcher.
///
/// The two limits guard different resources: `max_parallel` bounds CPU and
/// I/O concurrency, `gap_threshold` bounds how many loaded work items can be
/// resident ahead of the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// Maximum number of workers loading at the same time (default: 4).
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Maximum distance between dispatched items and the consumer's read
    /// index (default: 10).
    ///
    /// Counted against dispatched items, not completed ones: a worker's
    /// memory is committed as soon as it starts.
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: usize,
}

fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL
}

fn default_gap_threshold() -> usize {
    DEFAULT_GAP_THRESHOLD
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            gap_threshold: default_gap_threshold(),
        }
    }
}

impl PrefetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_gap_threshold(mut self, gap_threshold: usize) -> Self {
        self.gap_threshold = gap_threshold;
        self
    }

    /// Overlay `TRACEFETCH_MAX_PARALLEL` and `TRACEFETCH_GAP_THRESHOLD` onto
    /// the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(max_parallel) = optional_usize("TRACEFETCH_MAX_PARALLEL")? {
            config.max_parallel = max_parallel;
        }
        if let Some(gap_threshold) = optional_usize("TRACEFETCH_GAP_THRESHOLD")? {
            config.gap_threshold = gap_threshold;
        }
        config.validate()?;
        Ok(config)
    }

    /// Both limits must be at least 1, otherwise the dispatcher could never
    /// start the first item.
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == 0 {
            return Err(Error::Config(
                "max_parallel must be at least 1".to_string(),
            ));
        }
        if self.gap_threshold == 0 {
            return Err(Error::Config(
                "gap_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
