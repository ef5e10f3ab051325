//! Schedule iterators: the time source of the [`Scheduler`](super::Scheduler).

use std::time::{Duration, Instant};

/// Produces the successive fire times of a task.
///
/// The scheduler asks for the first fire time when the task is scheduled
/// and again after every firing. Returning `None` ends the schedule and
/// cancels the task.
pub trait ScheduleIterator: Send {
    /// The next instant at which the task should fire, or `None` to stop.
    fn next_execution(&mut self) -> Option<Instant>;
}

impl<F> ScheduleIterator for F
where
    F: FnMut() -> Option<Instant> + Send,
{
    fn next_execution(&mut self) -> Option<Instant> {
        self()
    }
}

/// Fires exactly once at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct OnceSchedule {
    at: Option<Instant>,
}

impl OnceSchedule {
    /// Fires at `at`.
    pub fn at(at: Instant) -> Self {
        Self { at: Some(at) }
    }

    /// Fires once `delay` has elapsed from now. A delay too large to add to
    /// the current instant yields no firing at all.
    pub fn after(delay: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(delay),
        }
    }
}

impl ScheduleIterator for OnceSchedule {
    fn next_execution(&mut self) -> Option<Instant> {
        self.at.take()
    }
}

/// Fires repeatedly at a fixed period.
///
/// The first firing happens at `first_time` (now, if unset) plus `delay`;
/// every following firing happens `period` after the previous call to
/// [`next_execution`](ScheduleIterator::next_execution). An optional limit
/// bounds the number of firings, and a firing instant that `Instant` cannot
/// represent ends the schedule.
#[derive(Debug, Clone)]
pub struct PeriodicSchedule {
    first_time: Option<Instant>,
    delay: Duration,
    period: Duration,
    remaining: Option<usize>,
    started: bool,
}

impl PeriodicSchedule {
    /// Creates a schedule firing every `period`, starting immediately.
    pub fn every(period: Duration) -> Self {
        Self {
            first_time: None,
            delay: Duration::ZERO,
            period,
            remaining: None,
            started: false,
        }
    }

    /// Sets the instant of the first firing.
    #[must_use]
    pub fn with_first_time(mut self, first_time: Instant) -> Self {
        self.first_time = Some(first_time);
        self
    }

    /// Sets a delay added to the first firing.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Limits the schedule to `count` firings.
    #[must_use]
    pub fn with_limit(mut self, count: usize) -> Self {
        self.remaining = Some(count);
        self
    }

    /// The configured period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl ScheduleIterator for PeriodicSchedule {
    fn next_execution(&mut self) -> Option<Instant> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        // an instant out of range ends the schedule
        let now = Instant::now();
        if self.started {
            now.checked_add(self.period)
        } else {
            self.started = true;
            self.first_time.unwrap_or(now).checked_add(self.delay)
        }
    }
}
