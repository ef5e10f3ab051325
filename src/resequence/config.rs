//! Resequencer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default maximum number of pending elements.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default time an element waits for its missing predecessor, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default name of the reader thread.
pub const DEFAULT_READER_THREAD_NAME: &str = "sequence-reader";

/// Errors raised while loading or validating a [`ResequencerConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The pending buffer must hold at least one element.
    #[error("invalid capacity {capacity}: must be at least 1")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// Thread names must not be empty.
    #[error("reader thread name must not be empty")]
    EmptyThreadName,

    /// The configuration document could not be parsed.
    #[error("failed to parse resequencer config: {message}")]
    Parse {
        /// The underlying parser message.
        message: String,
    },
}

/// Tunables of a resequencer pipeline.
///
/// Every field has a default, so a partial JSON document such as
/// `{"capacity": 10}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResequencerConfig {
    /// Maximum number of elements held back while waiting for a gap to close.
    pub capacity: usize,
    /// How long the smallest pending element may wait before the gap in
    /// front of it is skipped, in milliseconds.
    pub timeout_ms: u64,
    /// Name given to the reader thread.
    pub reader_thread_name: String,
}

impl Default for ResequencerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            reader_thread_name: DEFAULT_READER_THREAD_NAME.to_string(),
        }
    }
}

impl ResequencerConfig {
    /// Creates a configuration with the given capacity and timeout.
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            capacity,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    /// Parses a JSON document and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and the validation
    /// errors of [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] for a zero capacity and
    /// [`ConfigError::EmptyThreadName`] for a blank thread name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        if self.reader_thread_name.trim().is_empty() {
            return Err(ConfigError::EmptyThreadName);
        }
        Ok(())
    }

    /// The timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
