use criterion::{criterion_group, criterion_main};

mod resequence;

use resequence::register_benchmarks as register_resequence_benchmarks;
use scheduler::register_benchmarks as register_scheduler_benchmarks;

criterion_group!(
    benches,
    register_resequence_benchmarks,
    register_scheduler_benchmarks,
);

criterion_main!(benches);
