//! The synchronous transport collaborator fed by the
//! [`SequenceReader`](super::SequenceReader).

use std::error::Error as StdError;
use thiserror::Error;

/// Failure reported by a [`SequenceSender`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SendError {
    /// The transport rejected or failed to complete the send.
    #[error("send failed: {message}")]
    Failed {
        /// Human-readable reason.
        message: String,
    },

    /// The transport is gone and will not accept further sends.
    #[error("sender closed")]
    Closed,

    /// Any other transport error.
    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl SendError {
    /// Shorthand for [`SendError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        SendError::Failed {
            message: message.into(),
        }
    }
}

/// Performs the actual, synchronous send of resequenced elements.
///
/// Calls arrive strictly in sequence order, one at a time, from the reader
/// thread; each call completes (successfully or not) before the next one
/// starts. Retry policy, if any, belongs to the implementation.
pub trait SequenceSender<T>: Send + Sync {
    /// Sends a single element, blocking until the send completes.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the element could not be sent.
    fn send_sync(&self, element: T) -> Result<(), SendError>;

    /// Sends a batch of elements in list order, stopping at the first
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`SendError`] encountered; later elements are not
    /// sent.
    fn send_sync_batch(&self, elements: Vec<T>) -> Result<(), SendError> {
        for element in elements {
            self.send_sync(element)?;
        }
        Ok(())
    }
}

impl<T, F> SequenceSender<T> for F
where
    F: Fn(T) -> Result<(), SendError> + Send + Sync,
{
    fn send_sync(&self, element: T) -> Result<(), SendError> {
        self(element)
    }
}
