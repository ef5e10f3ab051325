//! The resequencing state machine.
//!
//! [`ResequencerEngine`] accepts elements in arbitrary order and emits them
//! to a [`SequenceSink`] in comparator order. The smallest pending element
//! (the head) is delivered as soon as it directly succeeds the last
//! delivered element. Otherwise it is held back until one of the following
//! happens:
//!
//! - its predecessor arrives (cascading delivery of the contiguous run),
//! - some pending element has waited for the configured timeout: everything
//!   up to and including that element goes out, skipping the gaps,
//! - the pending buffer grows beyond its capacity (the gap is skipped).
//!
//! The timeout runs from arrival, not from becoming the head, so smaller
//! elements arriving later never extend the wait of an element already
//! pending.
//!
//! All state lives behind one mutex shared by producers and the timeout
//! timer, so "gap / no gap" decisions are always made on a consistent view.

use super::comparator::SequenceElementComparator;
use super::config::{ConfigError, DEFAULT_TIMEOUT_MS};
use super::error::ResequencerError;
use super::sequence::{Sequence, not_after};
use crate::scheduler::{OnceSchedule, Scheduler, SchedulerTask};
use crossbeam::channel::{Sender, TrySendError};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// Default time a pending element waits for the gap in front of it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);

/// Destination of delivered elements.
///
/// `offer` is called with the engine lock held, in delivery order, and must
/// not block. Returns `false` if the element could not be accepted.
pub trait SequenceSink<T>: Send + Sync {
    /// Appends `element` to the destination.
    fn offer(&self, element: T) -> bool;
}

/// Use an unbounded channel: a full bounded channel drops the element.
impl<T: Send> SequenceSink<T> for Sender<T> {
    fn offer(&self, element: T) -> bool {
        match self.try_send(element) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                error!("Output queue full, delivered element dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Counters describing what an engine has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResequencerStats {
    /// Elements accepted into the pending buffer.
    pub received: u64,
    /// Elements handed to the sink, for any reason.
    pub delivered: u64,
    /// Deliveries that directly extended the delivered sequence.
    pub delivered_in_order: u64,
    /// Deliveries forced because a pending element waited for the full
    /// timeout.
    pub forced_by_timeout: u64,
    /// Deliveries forced because the buffer exceeded its capacity.
    pub forced_by_capacity: u64,
    /// Deliveries made by an explicit flush.
    pub flushed: u64,
    /// Elements dropped because an equal element was already pending.
    pub duplicates: u64,
    /// Elements dropped because they sort at or before the last delivered
    /// element.
    pub late: u64,
    /// Elements the sink refused (or missing sink).
    pub rejected: u64,
    /// Pending elements discarded by `stop`.
    pub discarded_on_stop: u64,
    /// Elements currently pending.
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryReason {
    InOrder,
    Timeout,
    Capacity,
    Flush,
}

struct ArmedTimer {
    deadline: Instant,
    task: Arc<SchedulerTask>,
}

struct EngineState<T> {
    pending: Sequence<T>,
    last_delivered: Option<T>,
    capacity: usize,
    timeout: Duration,
    sink: Option<Box<dyn SequenceSink<T>>>,
    timer: Option<ArmedTimer>,
    stopped: bool,
    stats: ResequencerStats,
}

struct Shared<T, C> {
    comparator: C,
    scheduler: Arc<Scheduler>,
    owns_scheduler: bool,
    state: Mutex<EngineState<T>>,
}

/// Re-emits elements in comparator order with bounded buffering and bounded
/// waiting.
///
/// `put` may be called concurrently from any number of threads. Delivery
/// happens on the calling thread (for in-order and capacity-forced
/// deliveries) or on the scheduler's timer thread (for timeout-forced
/// deliveries); either way the sink sees a strictly increasing sequence.
///
/// Elements that sort at or before the last delivered element are dropped:
/// their slot has already been delivered or skipped. Elements comparing
/// equal to a pending element are dropped as duplicates.
///
/// # Examples
///
/// ```
/// use resequencer_rs::{ResequencerEngine, SequenceNumberComparator};
/// use std::time::Duration;
///
/// let engine = ResequencerEngine::new(SequenceNumberComparator::new(), 10)?;
/// let (tx, rx) = crossbeam::channel::unbounded();
/// engine.set_out_queue(tx);
/// engine.set_last_delivered(2);
///
/// engine.put(4);
/// engine.put(3);
/// assert_eq!(rx.recv_timeout(Duration::from_secs(1)).ok(), Some(3));
/// assert_eq!(rx.recv_timeout(Duration::from_secs(1)).ok(), Some(4));
/// engine.stop();
/// # Ok::<(), resequencer_rs::ResequencerError>(())
/// ```
pub struct ResequencerEngine<T, C>
where
    T: Clone + Send + 'static,
    C: SequenceElementComparator<T> + 'static,
{
    shared: Arc<Shared<T, C>>,
}

impl<T, C> ResequencerEngine<T, C>
where
    T: Clone + Send + 'static,
    C: SequenceElementComparator<T> + 'static,
{
    /// Creates an engine with its own timer thread.
    ///
    /// The timeout defaults to [`DEFAULT_TIMEOUT`]; no sink is set.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::Config`] for a zero capacity and
    /// [`ResequencerError::Scheduler`] if the timer thread cannot start.
    pub fn new(comparator: C, capacity: usize) -> Result<Self, ResequencerError> {
        validate_capacity(capacity)?;
        let scheduler = Scheduler::with_name("resequencer-timer")?;
        Ok(Self::build(comparator, capacity, Arc::new(scheduler), true))
    }

    /// Creates an engine whose timeouts run on an existing scheduler.
    ///
    /// The scheduler is not shut down when the engine stops.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::Config`] for a zero capacity.
    pub fn with_scheduler(
        comparator: C,
        capacity: usize,
        scheduler: Arc<Scheduler>,
    ) -> Result<Self, ResequencerError> {
        validate_capacity(capacity)?;
        Ok(Self::build(comparator, capacity, scheduler, false))
    }

    fn build(comparator: C, capacity: usize, scheduler: Arc<Scheduler>, owns: bool) -> Self {
        let state = EngineState {
            pending: Sequence::new(),
            last_delivered: None,
            capacity,
            timeout: DEFAULT_TIMEOUT,
            sink: None,
            timer: None,
            stopped: false,
            stats: ResequencerStats::default(),
        };
        Self {
            shared: Arc::new(Shared {
                comparator,
                scheduler,
                owns_scheduler: owns,
                state: Mutex::new(state),
            }),
        }
    }

    /// Inserts `element` and delivers whatever can be delivered.
    ///
    /// Never blocks beyond the engine lock. After [`stop`](Self::stop) the
    /// call has no effect.
    pub fn put(&self, element: T) {
        let shared = &self.shared;
        let mut state = shared.lock_state();
        if state.stopped {
            trace!("Resequencer stopped, element ignored");
            return;
        }

        let late = state
            .last_delivered
            .as_ref()
            .is_some_and(|last| not_after(&element, last, &shared.comparator));
        if late {
            state.stats.late += 1;
            warn!("Element arrived after its slot was delivered or skipped, dropped");
            return;
        }

        let now = Instant::now();
        if !state.pending.insert(element, now, &shared.comparator) {
            state.stats.duplicates += 1;
            trace!("Duplicate element dropped");
            return;
        }
        state.stats.received += 1;

        shared.evaluate(&mut state, now);
    }

    /// The most recently delivered element, if any.
    #[must_use]
    pub fn last_delivered(&self) -> Option<T> {
        self.shared.lock_state().last_delivered.clone()
    }

    /// Seeds (or resumes) the sequence at `value`.
    ///
    /// Pending elements at or before `value` are dropped and counted as
    /// late, the same as if they arrived after it. A pending direct
    /// successor is delivered immediately.
    pub fn set_last_delivered(&self, value: T) {
        let shared = &self.shared;
        let mut state = shared.lock_state();

        let mut dropped: u64 = 0;
        while state
            .pending
            .first()
            .is_some_and(|head| not_after(&head.element, &value, &shared.comparator))
        {
            state.pending.pop_first();
            dropped += 1;
        }
        if dropped > 0 {
            state.stats.late += dropped;
            warn!(
                "{} pending elements at or before the new last delivered element dropped",
                dropped
            );
        }

        state.last_delivered = Some(value);
        if !state.stopped {
            shared.evaluate(&mut state, Instant::now());
        }
    }

    /// Longest time a pending element waits for the gap in front of it.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.shared.lock_state().timeout
    }

    /// Sets the timeout. Meant to be called before the engine is in use.
    ///
    /// A timeout too large to add to the current instant never fires; gaps
    /// are then only skipped by capacity or [`flush`](Self::flush).
    pub fn set_timeout(&self, timeout: Duration) {
        self.shared.lock_state().timeout = timeout;
    }

    /// Maximum number of pending elements.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.lock_state().capacity
    }

    /// Sets the capacity. Meant to be called before the engine is in use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] for zero.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), ConfigError> {
        validate_capacity(capacity)?;
        self.shared.lock_state().capacity = capacity;
        Ok(())
    }

    /// Sets the destination of delivered elements. Meant to be called
    /// before the engine is in use.
    pub fn set_out_queue<S>(&self, sink: S)
    where
        S: SequenceSink<T> + 'static,
    {
        self.shared.lock_state().sink = Some(Box::new(sink));
    }

    /// Delivers every pending element in order, skipping all gaps.
    ///
    /// Returns the number of elements delivered.
    pub fn flush(&self) -> usize {
        let shared = &self.shared;
        let mut state = shared.lock_state();
        let mut flushed = 0;
        while !state.pending.is_empty() {
            shared.deliver_first(&mut state, DeliveryReason::Flush);
            flushed += 1;
        }
        shared.rearm(&mut state);
        if flushed > 0 {
            debug!("Flushed {} pending elements", flushed);
        }
        flushed
    }

    /// Stops the engine.
    ///
    /// Cancels the timeout timer and discards the elements still waiting
    /// in the pending buffer; elements already handed to the sink are
    /// unaffected. Later calls to [`put`](Self::put) are ignored. Call
    /// [`flush`](Self::flush) first to deliver the pending elements instead.
    pub fn stop(&self) {
        let shared = &self.shared;
        let timer = {
            let mut state = shared.lock_state();
            if state.stopped {
                return;
            }
            state.stopped = true;
            let discarded = state.pending.clear();
            state.stats.discarded_on_stop += discarded as u64;
            if discarded > 0 {
                debug!("Resequencer stopped, {} pending elements discarded", discarded);
            } else {
                debug!("Resequencer stopped");
            }
            state.timer.take()
        };

        // outside the engine lock: a firing in progress needs it to finish
        if let Some(timer) = timer {
            timer.task.cancel();
        }
        if shared.owns_scheduler {
            shared.scheduler.cancel();
        }
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.lock_state().stopped
    }

    /// Number of elements waiting in the pending buffer.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.lock_state().pending.len()
    }

    /// Snapshot of the pending elements, smallest first.
    #[must_use]
    pub fn pending(&self) -> Vec<T> {
        self.shared.lock_state().pending.iter().cloned().collect()
    }

    /// Snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> ResequencerStats {
        let state = self.shared.lock_state();
        ResequencerStats {
            pending: state.pending.len(),
            ..state.stats
        }
    }
}

impl<T, C> Drop for ResequencerEngine<T, C>
where
    T: Clone + Send + 'static,
    C: SequenceElementComparator<T> + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T, C> Shared<T, C>
where
    T: Clone + Send + 'static,
    C: SequenceElementComparator<T> + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, EngineState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers every element that may go out at `now`, then makes sure a
    /// timer is armed for whatever is left, if anything.
    fn evaluate(self: &Arc<Self>, state: &mut EngineState<T>, now: Instant) {
        while let Some(reason) = self.next_delivery(state, now) {
            self.deliver_first(state, reason);
        }
        self.rearm(state);
    }

    fn next_delivery(&self, state: &EngineState<T>, now: Instant) -> Option<DeliveryReason> {
        let head = state.pending.first()?;
        let extends_sequence = state
            .last_delivered
            .as_ref()
            .is_some_and(|last| self.comparator.successor(&head.element, last));

        if extends_sequence {
            Some(DeliveryReason::InOrder)
        } else if state
            .pending
            .oldest_received_at()
            .is_some_and(|oldest| now.saturating_duration_since(oldest) >= state.timeout)
        {
            Some(DeliveryReason::Timeout)
        } else if state.pending.len() > state.capacity {
            Some(DeliveryReason::Capacity)
        } else {
            None
        }
    }

    fn deliver_first(&self, state: &mut EngineState<T>, reason: DeliveryReason) {
        let Some(entry) = state.pending.pop_first() else {
            return;
        };
        state.last_delivered = Some(entry.element.clone());

        let stats = &mut state.stats;
        stats.delivered += 1;
        match reason {
            DeliveryReason::InOrder => stats.delivered_in_order += 1,
            DeliveryReason::Timeout => {
                stats.forced_by_timeout += 1;
                debug!("Gap skipped after waiting {:?}", state.timeout);
            }
            DeliveryReason::Capacity => {
                stats.forced_by_capacity += 1;
                debug!("Gap skipped, pending buffer over capacity {}", state.capacity);
            }
            DeliveryReason::Flush => stats.flushed += 1,
        }

        let accepted = match state.sink.as_ref() {
            Some(sink) => sink.offer(entry.element),
            None => {
                warn!("No output queue set, delivered element discarded");
                false
            }
        };
        if accepted {
            trace!("Element delivered ({:?})", reason);
        } else {
            state.stats.rejected += 1;
            warn!("Output queue rejected delivered element");
        }
    }

    /// Arms a timer for the deadline of the longest waiting element, or
    /// cancels the timer if nothing is pending or the deadline is beyond
    /// what an `Instant` can represent.
    fn rearm(self: &Arc<Self>, state: &mut EngineState<T>) {
        let deadline = state
            .pending
            .oldest_received_at()
            .and_then(|oldest| oldest.checked_add(state.timeout));
        let Some(deadline) = deadline else {
            if let Some(timer) = state.timer.take() {
                timer.task.cancel();
            }
            return;
        };

        if let Some(timer) = state.timer.take() {
            if timer.deadline == deadline {
                state.timer = Some(timer);
                return;
            }
            timer.task.cancel();
        }

        let engine = Arc::downgrade(self);
        let task = SchedulerTask::new(move || {
            if let Some(engine) = engine.upgrade() {
                engine.on_timeout();
            }
        });
        match self.scheduler.schedule(&task, OnceSchedule::at(deadline)) {
            Ok(()) => {
                trace!("Timeout armed in {:?}", deadline.saturating_duration_since(Instant::now()));
                state.timer = Some(ArmedTimer { deadline, task });
            }
            Err(err) => error!("Failed to arm resequencer timeout: {}", err),
        }
    }

    fn on_timeout(self: &Arc<Self>) {
        let mut state = self.lock_state();
        if state.stopped {
            return;
        }
        let now = Instant::now();
        if state.timer.as_ref().is_some_and(|timer| timer.deadline <= now) {
            state.timer = None;
        }
        self.evaluate(&mut state, now);
    }
}

fn validate_capacity(capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::InvalidCapacity { capacity });
    }
    Ok(())
}
