//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if a variable is present but malformed.

pub mod prefetch;

pub use prefetch::{DEFAULT_GAP_THRESHOLD, DEFAULT_MAX_PARALLEL, PrefetchConfig};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub prefetch: PrefetchConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            prefetch: PrefetchConfig::from_env()?,
        })
    }
}

/// Parse an optional numeric variable. Unset means `None`; set but not a
/// number is an error.
pub(crate) fn optional_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<usize>().map(Some).map_err(|e| {
            Error::Config(format!("environment variable {name}={raw:?} is not a count: {e}"))
        }),
        Err(_) => Ok(None),
    }
}
