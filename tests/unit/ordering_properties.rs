//! Property tests for the engine's ordering guarantees.

use crossbeam::channel::{self, Receiver};
use proptest::prelude::*;
use resequencer_rs::{ResequencerEngine, SequenceNumberComparator};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type Engine = ResequencerEngine<i64, SequenceNumberComparator>;

fn engine(capacity: usize) -> (Engine, Receiver<i64>) {
    let engine = ResequencerEngine::new(SequenceNumberComparator::new(), capacity).expect("engine");
    engine.set_timeout(Duration::from_secs(60));
    let (tx, rx) = channel::unbounded();
    engine.set_out_queue(tx);
    (engine, rx)
}

fn permutation(len: i64) -> impl Strategy<Value = Vec<i64>> {
    Just((0..len).collect::<Vec<_>>()).prop_shuffle()
}

/// Waits until nothing is pending, giving up after `limit`.
fn settle(engine: &Engine, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while engine.pending_len() > 0 {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    true
}

/// Distinct values with gaps between them, in random order.
fn sparse_permutation() -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::btree_set(0_i64..500, 0..120)
        .prop_flat_map(|values| Just(values.into_iter().collect::<Vec<_>>()).prop_shuffle())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A complete permutation comes out fully sorted without any forcing.
    #[test]
    fn permutation_is_restored(input in permutation(200)) {
        let (engine, rx) = engine(input.len());
        engine.set_last_delivered(-1);
        for &n in &input {
            engine.put(n);
        }

        let delivered: Vec<i64> = rx.try_iter().collect();
        prop_assert_eq!(delivered, (0..200).collect::<Vec<_>>());
        let stats = engine.stats();
        prop_assert_eq!(stats.delivered_in_order, 200);
        prop_assert_eq!(stats.pending, 0);
        engine.stop();
    }

    /// With gaps and no forcing, flush delivers exactly the sorted input.
    #[test]
    fn flush_delivers_sorted_input_with_gaps(input in sparse_permutation()) {
        let (engine, rx) = engine(1_000);
        engine.set_last_delivered(-1);
        for &n in &input {
            engine.put(n);
        }
        engine.flush();

        let mut expected = input.clone();
        expected.sort_unstable();
        let delivered: Vec<i64> = rx.try_iter().collect();
        prop_assert_eq!(delivered, expected);
        engine.stop();
    }

    /// Under capacity pressure the output stays strictly increasing and every
    /// input is accounted for.
    #[test]
    fn output_is_strictly_increasing_under_pressure(
        input in proptest::collection::vec(0_i64..60, 0..150),
        capacity in 1_usize..8,
    ) {
        let (engine, rx) = engine(capacity);
        for &n in &input {
            engine.put(n);
            prop_assert!(engine.pending_len() <= capacity);
        }
        engine.flush();

        let delivered: Vec<i64> = rx.try_iter().collect();
        prop_assert!(delivered.windows(2).all(|pair| pair[0] < pair[1]));

        let distinct: BTreeSet<i64> = input.iter().copied().collect();
        prop_assert!(delivered.iter().all(|n| distinct.contains(n)));

        let stats = engine.stats();
        prop_assert_eq!(stats.received, stats.delivered);
        prop_assert_eq!(stats.received + stats.duplicates + stats.late, input.len() as u64);
        engine.stop();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Several producers racing the timer thread, with no flush: gaps are
    /// skipped only by timeouts, yet the output never goes backward and
    /// every accepted element is delivered.
    #[test]
    fn timeouts_keep_order_under_concurrent_producers(
        lanes in proptest::collection::vec(proptest::collection::vec(0_i64..400, 0..80), 2..6),
    ) {
        let (engine, rx) = engine(1_000);
        engine.set_timeout(Duration::from_millis(5));
        let engine = Arc::new(engine);

        let producers: Vec<_> = lanes
            .iter()
            .cloned()
            .map(|lane| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for (i, n) in lane.into_iter().enumerate() {
                        engine.put(n);
                        if i % 8 == 7 {
                            thread::sleep(Duration::from_millis(1));
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            prop_assert!(producer.join().is_ok());
        }
        prop_assert!(settle(&engine, Duration::from_secs(5)));

        let delivered: Vec<i64> = rx.try_iter().collect();
        prop_assert!(delivered.windows(2).all(|pair| pair[0] < pair[1]));

        let total: usize = lanes.iter().map(Vec::len).sum();
        let stats = engine.stats();
        prop_assert_eq!(stats.received, stats.delivered);
        prop_assert_eq!(stats.delivered, delivered.len() as u64);
        prop_assert_eq!(stats.received + stats.duplicates + stats.late, total as u64);
        prop_assert_eq!(stats.flushed, 0);
        engine.stop();
    }
}
