mod pipeline;

use criterion::Criterion;

/// Register all resequencing benchmarks.
pub fn register_benchmarks(c: &mut Criterion) {
    engine::register_benchmarks(c);
    pipeline::register_benchmarks(c);
}
