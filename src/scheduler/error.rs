//! Error types for the scheduler subsystem.

use super::task::TaskState;
use std::fmt;

/// Errors returned by [`Scheduler`](super::Scheduler) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
    /// The task was not in the [`TaskState::Virgin`] state when it was
    /// handed to the scheduler: it is already scheduled, was cancelled or
    /// has run its schedule to the end.
    IllegalState {
        /// The state the task was found in.
        state: TaskState,
    },

    /// The scheduler has been cancelled and its timer thread is gone.
    Shutdown,

    /// The timer thread could not be spawned.
    ThreadSpawn {
        /// The underlying I/O error message.
        message: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::IllegalState { state } => {
                write!(f, "task already scheduled, cancelled or executed (state: {state})")
            }
            SchedulerError::Shutdown => write!(f, "scheduler has been shut down"),
            SchedulerError::ThreadSpawn { message } => {
                write!(f, "failed to spawn scheduler thread: {message}")
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<std::io::Error> for SchedulerError {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        SchedulerError::ThreadSpawn {
            message: err.to_string(),
        }
    }
}
