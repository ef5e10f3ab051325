//! Schedulable tasks and their lifecycle.
//!
//! A [`SchedulerTask`] wraps an action together with its lifecycle
//! (`Virgin -> Scheduled`, then `Cancelled` or `Executed`). Every transition
//! happens under the task's own mutex, so the decision "may this task still
//! be scheduled or fired" is atomic with respect to concurrent `cancel`
//! calls.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Lifecycle state of a [`SchedulerTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created but never handed to a scheduler.
    Virgin,
    /// Handed to a scheduler; a firing is pending.
    Scheduled,
    /// Cancelled before its schedule ran out.
    Cancelled,
    /// The last firing of its schedule has started; nothing is pending.
    Executed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Virgin => write!(f, "virgin"),
            TaskState::Scheduled => write!(f, "scheduled"),
            TaskState::Cancelled => write!(f, "cancelled"),
            TaskState::Executed => write!(f, "executed"),
        }
    }
}

type TaskAction = Box<dyn Fn() + Send + Sync>;

/// A unit of work that can be run by a [`Scheduler`](super::Scheduler),
/// once or repeatedly.
///
/// Tasks are always handled through an `Arc` since both the owner (who may
/// cancel) and the scheduler (who fires) hold on to them.
pub struct SchedulerTask {
    id: Uuid,
    state: Mutex<TaskState>,
    action: TaskAction,
}

impl SchedulerTask {
    /// Creates a new task in the [`TaskState::Virgin`] state.
    pub fn new<F>(action: F) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: Uuid::new_v4(),
            state: Mutex::new(TaskState::Virgin),
            action: Box::new(action),
        })
    }

    /// Unique identifier of this task, used in log output.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        *self.lock_state()
    }

    /// Returns `true` once the task has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Cancels the task so that no pending firing starts. A firing that is
    /// already running is not interrupted.
    ///
    /// Returns `true` if the task was [`TaskState::Scheduled`] at the time of
    /// the call, i.e. a pending firing was preempted. Calling it again, on a
    /// task that was never scheduled, or on a task whose last firing has
    /// already started, returns `false`.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock_state();
        let preempted = *state == TaskState::Scheduled;
        if *state != TaskState::Executed {
            *state = TaskState::Cancelled;
        }
        preempted
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn run(&self) {
        (self.action)();
    }
}

impl fmt::Debug for SchedulerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerTask")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
