use criterion::{Criterion, Throughput};
use resequencer_rs::{Resequencer, ResequencerConfig, SendError, SequenceNumberComparator};
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Register end-to-end pipeline benchmarks.
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("Resequencer - Pipeline");
    let count = 10_000_i64;
    group.throughput(Throughput::Elements(count as u64));

    group.bench_function("swapped_pairs_to_sender", |b| {
        b.iter(|| {
            let sent = Arc::new(AtomicU64::new(0));
            let counter = Arc::clone(&sent);
            let sender = move |n: i64| -> Result<(), SendError> {
                counter.fetch_add(black_box(n) as u64 & 1, Ordering::Relaxed);
                Ok(())
            };
            let config = ResequencerConfig {
                capacity: count as usize,
                ..ResequencerConfig::default()
            };
            let pipeline = Resequencer::start(&config, SequenceNumberComparator::new(), sender)
                .unwrap_or_else(|e| panic!("pipeline: {e}"));
            pipeline.engine().set_last_delivered(-1);

            for n in (0..count).step_by(2) {
                pipeline.process(n + 1);
                pipeline.process(n);
            }
            if let Err(e) = pipeline.stop() {
                panic!("stop: {e}");
            }
            black_box(sent.load(Ordering::Relaxed))
        });
    });

    group.finish();
}
