//! # Resequencer
//!
//! Restores sequence order to a stream of elements that arrive out of order,
//! without waiting forever for elements that never come.
//!
//! ## Key Features
//!
//! - **Ordered Delivery**: Elements are released strictly in sequence order.
//!   An element goes out as soon as it directly follows the last delivered
//!   one, as decided by a [`SequenceElementComparator`].
//!
//! - **Bounded Waiting**: No element waits longer than the configured
//!   timeout, counted from its own arrival. Gaps in front of it are skipped
//!   then, or as soon as the pending buffer grows past its capacity.
//!
//! - **Thread-Safe Engine**: [`ResequencerEngine::put`] can be called from any
//!   number of producer threads. Timeouts run on a [`Scheduler`] thread.
//!
//! - **Isolated Transport**: Delivered elements are forwarded by a
//!   [`SequenceReader`] on its own thread, so a slow [`SequenceSender`] never
//!   blocks producers.
//!
//! - **Generic Scheduling**: The [`scheduler`] module is usable on its own for
//!   one-shot and periodic tasks.
//!
//! ## Delivery Rules
//!
//! Each time the pending set changes or a timeout fires, the engine repeatedly
//! delivers the smallest pending element while one of these holds:
//!
//! 1. it is the successor of the last delivered element;
//! 2. some pending element, this one or a larger one, has been pending for
//!    at least the timeout;
//! 3. more elements are pending than the capacity allows.
//!
//! Elements at or before the last delivered one are dropped as late, and an
//! element equal to one already pending is dropped as a duplicate. Moving the
//! last delivered marker forward drops the pending elements it passes. Stopping
//! the engine discards everything still waiting on a gap.
//!
//! ## Example
//!
//! ```rust
//! use resequencer_rs::{ResequencerEngine, SequenceNumberComparator};
//! use std::time::Duration;
//!
//! let (tx, rx) = crossbeam::channel::unbounded();
//! let engine = ResequencerEngine::new(SequenceNumberComparator::new(), 10)?;
//! engine.set_timeout(Duration::from_millis(50));
//! engine.set_out_queue(tx);
//! engine.set_last_delivered(0_i64);
//!
//! engine.put(3);
//! engine.put(1);
//! engine.put(2);
//! assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
//!
//! engine.stop();
//! # Ok::<(), resequencer_rs::ResequencerError>(())
//! ```
//!
//! For a pipeline with a reader thread and a sender, see [`Resequencer`].

pub mod prelude;
pub mod resequence;
pub mod scheduler;

pub use resequence::{
    ConfigError, ReaderQueue, Resequencer, ResequencerConfig, ResequencerEngine, ResequencerError,
    ResequencerStats, SendError, SequenceElementComparator, SequenceItem, SequenceNumberComparator,
    SequenceReader, SequenceSender, SequenceSink, Sequenced, SequencedMessage,
};
pub use scheduler::{
    OnceSchedule, PeriodicSchedule, ScheduleIterator, Scheduler, SchedulerError, SchedulerTask,
    TaskState,
};
