//! Example demonstrating the engine with crossbeam channels
//!
//! Several producer threads publish interleaved sequence numbers while a
//! consumer thread reads the engine's output channel and checks that it
//! arrives in order.

use crossbeam::channel;
use resequencer_rs::{ResequencerEngine, SequenceNumberComparator};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

const PRODUCERS: u32 = 4;
const MESSAGES: u32 = 10_000;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let engine = match ResequencerEngine::new(SequenceNumberComparator::new(), 1_000) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Failed to create engine: {}", e);
            return;
        }
    };
    engine.set_timeout(Duration::from_millis(100));
    engine.set_last_delivered(0_u32);

    let (tx, rx) = channel::unbounded();
    engine.set_out_queue(tx);

    let consumer = thread::spawn(move || {
        let mut expected = 1;
        let mut out_of_place = 0;
        while let Ok(n) = rx.recv_timeout(Duration::from_millis(500)) {
            if n != expected {
                out_of_place += 1;
            }
            expected = n + 1;
        }
        (expected - 1, out_of_place)
    });

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for n in (1 + producer..=MESSAGES).step_by(PRODUCERS as usize) {
                    engine.put(n);
                }
            })
        })
        .collect();
    for producer in producers {
        if producer.join().is_err() {
            warn!("A producer thread panicked");
        }
    }

    let stats = engine.stats();
    info!(
        "Producers done: delivered={}, in_order={}, forced_by_capacity={}, pending={}",
        stats.delivered, stats.delivered_in_order, stats.forced_by_capacity, stats.pending
    );
    engine.stop();
    drop(engine);

    match consumer.join() {
        Ok((last, out_of_place)) => {
            info!("Consumer saw up to {} with {} skipped positions", last, out_of_place)
        }
        Err(_) => error!("Consumer thread panicked"),
    }
}
