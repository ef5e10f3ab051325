//! Integration tests for the resequencer engine.

use crossbeam::channel::{self, Receiver};
use resequencer_rs::{
    ResequencerEngine, Scheduler, SequenceElementComparator, SequenceNumberComparator,
    SequencedMessage,
};
use std::cmp::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const LONG_TIMEOUT: Duration = Duration::from_secs(60);

fn engine_with_channel<T, C>(
    comparator: C,
    capacity: usize,
    timeout: Duration,
) -> (ResequencerEngine<T, C>, Receiver<T>)
where
    T: Clone + Send + 'static,
    C: SequenceElementComparator<T> + 'static,
{
    let engine = ResequencerEngine::new(comparator, capacity).expect("engine");
    engine.set_timeout(timeout);
    let (tx, rx) = channel::unbounded();
    engine.set_out_queue(tx);
    (engine, rx)
}

/// Adjacent elements differ by two; used to check that the engine never
/// assumes `n + 1`.
struct EvenComparator;

impl SequenceElementComparator<u32> for EvenComparator {
    fn successor(&self, o1: &u32, o2: &u32) -> bool {
        o2.checked_add(2) == Some(*o1)
    }

    fn compare(&self, o1: &u32, o2: &u32) -> Ordering {
        o1.cmp(o2)
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn messages_are_delivered_by_sequence_number() {
    let (engine, rx) = engine_with_channel(SequenceNumberComparator::new(), 10, LONG_TIMEOUT);
    engine.set_last_delivered(SequencedMessage::new(0, String::new()));

    for n in [3_i64, 1, 2] {
        engine.put(SequencedMessage::new(n, format!("payload-{n}")));
    }

    let payloads: Vec<String> = rx.try_iter().map(|message| message.payload).collect();
    assert_eq!(payloads, vec!["payload-1", "payload-2", "payload-3"]);
    engine.stop();
}

#[test]
fn custom_comparator_decides_adjacency() {
    let (engine, rx) = engine_with_channel(EvenComparator, 10, LONG_TIMEOUT);
    engine.set_last_delivered(0);

    engine.put(6);
    engine.put(4);
    assert!(rx.try_recv().is_err());
    engine.put(2);

    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![2, 4, 6]);
    assert_eq!(engine.last_delivered(), Some(6));
    engine.stop();
}

#[test]
fn concurrent_producers_interleave_into_one_sequence() {
    let (engine, rx) = engine_with_channel(SequenceNumberComparator::new(), 10_000, LONG_TIMEOUT);
    engine.set_last_delivered(-1_i64);
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|producer| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for n in (producer..2_000).step_by(8) {
                    engine.put(n);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer thread");
    }

    let delivered: Vec<i64> = rx.try_iter().collect();
    assert_eq!(delivered, (0..2_000).collect::<Vec<_>>());
    assert_eq!(engine.pending_len(), 0);
    engine.stop();
}

// ---------------------------------------------------------------------------
// Gap handling
// ---------------------------------------------------------------------------

#[test]
fn timeout_skips_a_gap_that_never_closes() {
    let (engine, rx) = engine_with_channel(SequenceNumberComparator::new(), 10, Duration::from_millis(50));
    engine.set_last_delivered(0_i32);

    engine.put(2);
    engine.put(3);
    assert!(rx.try_recv().is_err());

    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).ok(), Some(2));
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).ok(), Some(3));

    // the skipped slot is late now
    engine.put(1);
    assert_eq!(engine.stats().late, 1);
    engine.stop();
}

#[test]
fn capacity_change_takes_effect_on_next_put() {
    let (engine, rx) = engine_with_channel(SequenceNumberComparator::new(), 10, LONG_TIMEOUT);
    engine.set_last_delivered(0_i32);

    for n in [5, 6, 7] {
        engine.put(n);
    }
    assert!(rx.try_recv().is_err());

    assert!(engine.set_capacity(2).is_ok());
    assert!(engine.set_capacity(0).is_err());
    engine.put(9);

    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![5, 6, 7]);
    assert_eq!(engine.pending(), vec![9]);
    assert_eq!(engine.stats().forced_by_capacity, 1);
    engine.stop();
}

#[test]
fn flush_then_stop_loses_nothing() {
    let (engine, rx) = engine_with_channel(SequenceNumberComparator::new(), 100, LONG_TIMEOUT);
    engine.set_last_delivered(0_i32);

    for n in [10, 4, 7, 1] {
        engine.put(n);
    }
    assert_eq!(engine.flush(), 3);
    engine.stop();

    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 4, 7, 10]);
    let stats = engine.stats();
    assert_eq!(stats.discarded_on_stop, 0);
    assert_eq!(stats.received, stats.delivered);
}

// ---------------------------------------------------------------------------
// Lifecycle and statistics
// ---------------------------------------------------------------------------

#[test]
fn engines_can_share_one_scheduler() {
    let scheduler = Arc::new(Scheduler::with_name("shared-timer").expect("scheduler"));
    let timeout = Duration::from_millis(30);

    let (tx_a, rx_a) = channel::unbounded();
    let a = ResequencerEngine::with_scheduler(SequenceNumberComparator::new(), 10, Arc::clone(&scheduler))
        .expect("engine a");
    a.set_timeout(timeout);
    a.set_out_queue(tx_a);
    a.set_last_delivered(0_i32);

    let (tx_b, rx_b) = channel::unbounded();
    let b = ResequencerEngine::with_scheduler(SequenceNumberComparator::new(), 10, Arc::clone(&scheduler))
        .expect("engine b");
    b.set_timeout(timeout);
    b.set_out_queue(tx_b);
    b.set_last_delivered(100_i32);

    a.put(5);
    b.put(105);

    assert_eq!(rx_a.recv_timeout(Duration::from_secs(2)).ok(), Some(5));
    assert_eq!(rx_b.recv_timeout(Duration::from_secs(2)).ok(), Some(105));

    a.stop();
    assert!(!scheduler.is_shutdown());
    b.stop();
    scheduler.cancel();
}

#[test]
fn stats_serialize_to_json() {
    let (engine, _rx) = engine_with_channel(SequenceNumberComparator::new(), 10, LONG_TIMEOUT);
    engine.set_last_delivered(0_i32);
    engine.put(1);
    engine.put(1);
    engine.put(3);

    let json = serde_json::to_value(engine.stats()).expect("serialize stats");
    assert_eq!(json["delivered"], 1);
    assert_eq!(json["late"], 1);
    assert_eq!(json["pending"], 1);
    engine.stop();
}

#[test]
fn dropping_the_engine_stops_its_timer() {
    let (engine, rx) = engine_with_channel(SequenceNumberComparator::new(), 10, Duration::from_millis(50));
    engine.set_last_delivered(0_i32);
    engine.put(2);
    drop(engine);

    thread::sleep(Duration::from_millis(150));
    assert!(rx.try_recv().is_err());
}
