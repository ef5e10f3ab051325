//! Resequencing: restoring sequence order to elements that arrive out of
//! order.
//!
//! # Types
//!
//! - [`ResequencerEngine`]: buffers elements and delivers them in order,
//!   skipping a gap once the timeout expires or the buffer overflows
//! - [`SequenceElementComparator`]: decides ordering and adjacency
//! - [`SequenceNumberComparator`]: the stock comparator for [`Sequenced`]
//!   elements
//! - [`SequenceReader`]: forwards delivered elements to a [`SequenceSender`]
//!   on its own thread
//! - [`Resequencer`]: engine, reader and sender wired into one pipeline
//! - [`ResequencerConfig`]: capacity, timeout and thread name
//!
//! Elements at or before the last delivered one are dropped as late, and
//! duplicates of a pending element are dropped on insert. Both are counted in
//! [`ResequencerStats`].

pub mod comparator;
pub mod config;
pub mod engine;
pub mod error;
pub mod reader;
pub mod resequencer;
pub mod sender;
mod sequence;

pub use comparator::{
    SequenceElementComparator, SequenceNumberComparator, Sequenced, SequencedMessage,
};
pub use config::{
    ConfigError, DEFAULT_CAPACITY, DEFAULT_READER_THREAD_NAME, DEFAULT_TIMEOUT_MS,
    ResequencerConfig,
};
pub use engine::{DEFAULT_TIMEOUT, ResequencerEngine, ResequencerStats, SequenceSink};
pub use error::ResequencerError;
pub use reader::{ReaderQueue, SequenceItem, SequenceReader};
pub use resequencer::Resequencer;
pub use sender::{SendError, SequenceSender};
