//! Prelude module that re-exports commonly used types and traits.
//!
//! ```rust
//! use resequencer_rs::prelude::*;
//! ```

// Pipeline
pub use crate::resequence::{Resequencer, ResequencerConfig, ResequencerError};

// Engine and its collaborators
pub use crate::resequence::{
    ResequencerEngine, ResequencerStats, SequenceElementComparator, SequenceNumberComparator,
    SequenceSink, Sequenced, SequencedMessage,
};

// Reader side
pub use crate::resequence::{SendError, SequenceItem, SequenceReader, SequenceSender};

// Scheduling
pub use crate::scheduler::{
    OnceSchedule, PeriodicSchedule, ScheduleIterator, Scheduler, SchedulerError, SchedulerTask,
    TaskState,
};
