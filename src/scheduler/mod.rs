//! Generic task scheduling used as the resequencer's timeout mechanism.
//!
//! # Types
//!
//! - [`SchedulerTask`]: an action with a `Virgin -> Scheduled` lifecycle
//!   that ends `Cancelled` or `Executed`
//! - [`ScheduleIterator`]: produces successive fire times, `None` ends the
//!   schedule
//! - [`OnceSchedule`] and [`PeriodicSchedule`]: the two stock iterators
//! - [`Scheduler`]: runs tasks on a dedicated timer thread
//! - [`SchedulerError`]: illegal-state and shutdown failures

mod timer;
pub mod error;
pub mod iterator;
pub mod task;

pub use self::timer::Scheduler;
pub use error::SchedulerError;
pub use iterator::{OnceSchedule, PeriodicSchedule, ScheduleIterator};
pub use task::{SchedulerTask, TaskState};

pub(crate) use self::timer::panic_message;
