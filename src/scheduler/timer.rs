//! The timer thread driving [`SchedulerTask`]s.

use super::error::SchedulerError;
use super::iterator::ScheduleIterator;
use super::task::{SchedulerTask, TaskState};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, trace, warn};

/// Default name of the timer thread.
const DEFAULT_THREAD_NAME: &str = "scheduler";

/// A task waiting for its next fire time.
struct Entry {
    at: Instant,
    /// Tie-breaker keeping FIFO order between entries due at the same instant.
    seq: u64,
    task: Arc<SchedulerTask>,
    iterator: Box<dyn ScheduleIterator>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

enum Command {
    Schedule(Entry),
    Shutdown,
}

/// Runs [`SchedulerTask`]s on a dedicated timer thread according to their
/// [`ScheduleIterator`]s.
///
/// Scheduling only enqueues a command for the timer thread, so callers never
/// wait on another task's execution. Tasks due at the same time fire in the
/// order they were scheduled. A panic inside a task is caught and logged;
/// the timer thread keeps running and the task is rescheduled as usual.
///
/// # Examples
///
/// ```
/// use resequencer_rs::scheduler::{OnceSchedule, Scheduler, SchedulerTask};
/// use std::time::Duration;
///
/// let scheduler = Scheduler::new()?;
/// let task = SchedulerTask::new(|| println!("fired"));
/// scheduler.schedule(&task, OnceSchedule::after(Duration::from_millis(10)))?;
/// // scheduling the same task again is a programming error
/// assert!(scheduler.schedule(&task, OnceSchedule::after(Duration::ZERO)).is_err());
/// scheduler.cancel();
/// # Ok::<(), resequencer_rs::scheduler::SchedulerError>(())
/// ```
pub struct Scheduler {
    name: String,
    commands: Sender<Command>,
    shutdown: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a scheduler with a timer thread named `scheduler`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ThreadSpawn`] if the thread cannot be spawned.
    pub fn new() -> Result<Self, SchedulerError> {
        Self::with_name(DEFAULT_THREAD_NAME)
    }

    /// Creates a scheduler whose timer thread carries the given name.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ThreadSpawn`] if the thread cannot be spawned.
    pub fn with_name(name: &str) -> Result<Self, SchedulerError> {
        let (sender, receiver) = channel::unbounded();
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_timer(&thread_name, receiver))?;

        debug!("Scheduler '{}' started", name);
        Ok(Self {
            name: name.to_string(),
            commands: sender,
            shutdown: AtomicBool::new(false),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Name of the timer thread.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(AtomicOrdering::Acquire)
    }

    /// Schedules `task` to fire at the instants produced by `iterator`.
    ///
    /// If the iterator yields no first instant the task is cancelled without
    /// ever running.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::IllegalState`] if the task is not
    ///   [`TaskState::Virgin`] (already scheduled, cancelled or executed).
    /// - [`SchedulerError::Shutdown`] if the scheduler has been cancelled.
    pub fn schedule<I>(
        &self,
        task: &Arc<SchedulerTask>,
        mut iterator: I,
    ) -> Result<(), SchedulerError>
    where
        I: ScheduleIterator + 'static,
    {
        let mut state = task.lock_state();
        if *state != TaskState::Virgin {
            return Err(SchedulerError::IllegalState { state: *state });
        }
        if self.is_shutdown() {
            return Err(SchedulerError::Shutdown);
        }

        let Some(at) = iterator.next_execution() else {
            *state = TaskState::Cancelled;
            trace!("Task {} has no execution time, cancelled", task.id());
            return Ok(());
        };

        let entry = Entry {
            at,
            seq: 0,
            task: Arc::clone(task),
            iterator: Box::new(iterator),
        };
        self.commands
            .send(Command::Schedule(entry))
            .map_err(|_| SchedulerError::Shutdown)?;
        *state = TaskState::Scheduled;

        trace!("Task {} scheduled on '{}'", task.id(), self.name);
        Ok(())
    }

    /// Shuts the timer thread down and cancels every task still queued.
    ///
    /// Waits for a firing in progress to complete, unless called from the
    /// timer thread itself. Calling it more than once is harmless.
    pub fn cancel(&self) {
        if self.shutdown.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        // the receiver is gone only if the thread already exited
        let _ = self.commands.send(Command::Shutdown);

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("Scheduler '{}' thread terminated abnormally", self.name);
            }
        }
        debug!("Scheduler '{}' stopped", self.name);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if !self.shutdown.swap(true, AtomicOrdering::AcqRel) {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

fn run_timer(name: &str, commands: Receiver<Command>) {
    let mut queue: BinaryHeap<Reverse<Entry>> = BinaryHeap::new();
    let mut next_seq: u64 = 0;

    loop {
        let received = match queue.peek() {
            Some(Reverse(head)) => commands.recv_deadline(head.at),
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Command::Schedule(mut entry)) => {
                entry.seq = next_seq;
                next_seq += 1;
                queue.push(Reverse(entry));
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        fire_due(&mut queue, &mut next_seq);
    }

    // tasks scheduled after the shutdown command never get a firing either
    let leftover = queue
        .into_iter()
        .map(|Reverse(entry)| entry)
        .chain(commands.try_iter().filter_map(|command| match command {
            Command::Schedule(entry) => Some(entry),
            Command::Shutdown => None,
        }));
    for entry in leftover {
        entry.task.cancel();
    }
    trace!("Timer thread '{}' exited", name);
}

fn fire_due(queue: &mut BinaryHeap<Reverse<Entry>>, next_seq: &mut u64) {
    let now = Instant::now();
    let mut rescheduled = Vec::new();

    while queue.peek().is_some_and(|Reverse(head)| head.at <= now) {
        let Some(Reverse(entry)) = queue.pop() else {
            break;
        };
        if let Some(next) = fire(entry) {
            rescheduled.push(next);
        }
    }

    for mut entry in rescheduled {
        entry.seq = *next_seq;
        *next_seq += 1;
        queue.push(Reverse(entry));
    }
}

/// Runs one firing and returns the entry for the next one, if any.
///
/// The next firing is taken from the iterator before the action runs, so a
/// task whose schedule ends here is already [`TaskState::Executed`] while
/// its last action runs and can no longer be cancelled.
fn fire(entry: Entry) -> Option<Entry> {
    let Entry {
        task, mut iterator, ..
    } = entry;

    let next = {
        let mut state = task.lock_state();
        if *state != TaskState::Scheduled {
            trace!("Skipping {} task {}", *state, task.id());
            return None;
        }
        let next = iterator.next_execution();
        if next.is_none() {
            *state = TaskState::Executed;
        }
        next
    };

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
        error!(
            "Scheduled task {} panicked: {}",
            task.id(),
            panic_message(payload.as_ref())
        );
    }

    // cancelled while running
    let next = next.filter(|_| task.state() == TaskState::Scheduled)?;
    Some(Entry {
        at: next,
        seq: 0,
        task,
        iterator,
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
