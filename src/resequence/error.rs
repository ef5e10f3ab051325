//! Error type for the resequencing pipeline.

use super::config::ConfigError;
use crate::scheduler::SchedulerError;
use std::fmt;

/// Errors raised while building, starting or stopping a resequencer
/// pipeline.
///
/// Element flow itself never fails: `put` has no error channel, and send
/// failures are logged by the reader.
#[derive(Debug)]
#[non_exhaustive]
pub enum ResequencerError {
    /// The timer backing the engine's timeouts failed.
    Scheduler(SchedulerError),

    /// The configuration was rejected.
    Config(ConfigError),

    /// A worker thread could not be spawned.
    ThreadSpawn {
        /// Name of the thread that failed to start.
        name: String,
        /// The underlying I/O error message.
        message: String,
    },

    /// [`SequenceReader::start`](super::SequenceReader::start) was called on
    /// a reader that has already been started.
    ReaderAlreadyStarted,

    /// The reader thread panicked instead of exiting cleanly.
    ReaderPanicked {
        /// The panic message.
        message: String,
    },
}

impl fmt::Display for ResequencerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResequencerError::Scheduler(err) => write!(f, "scheduler error: {err}"),
            ResequencerError::Config(err) => write!(f, "configuration error: {err}"),
            ResequencerError::ThreadSpawn { name, message } => {
                write!(f, "failed to spawn thread '{name}': {message}")
            }
            ResequencerError::ReaderAlreadyStarted => {
                write!(f, "sequence reader already started")
            }
            ResequencerError::ReaderPanicked { message } => {
                write!(f, "sequence reader panicked: {message}")
            }
        }
    }
}

impl std::error::Error for ResequencerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResequencerError::Scheduler(err) => Some(err),
            ResequencerError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchedulerError> for ResequencerError {
    fn from(err: SchedulerError) -> Self {
        ResequencerError::Scheduler(err)
    }
}

impl From<ConfigError> for ResequencerError {
    fn from(err: ConfigError) -> Self {
        ResequencerError::Config(err)
    }
}
