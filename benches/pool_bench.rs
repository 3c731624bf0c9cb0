use criterion::{criterion_group, criterion_main, Criterion};
use livefeed::{FeedError, Job, PoolExecutor, RayonPool, Result, SharedQueuePool};
use rand::prelude::*;

/// Simulates a lookup: some arithmetic, and an error for every tenth input.
fn lookup(n: &u64) -> Result<u64> {
    if n % 10 == 0 {
        return Err(FeedError::MetadataNotFound);
    }
    Ok((0..*n % 1000).fold(*n, |acc, i| acc.wrapping_mul(31).wrapping_add(i)))
}

fn random_inputs() -> Vec<u64> {
    let mut rng = thread_rng();
    (0..1000).map(|_| rng.gen_range(0..100_000)).collect()
}

fn execute_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    let workers = num_cpus::get() as i64;

    group.bench_function("shared_queue", |b| {
        b.iter_batched(
            random_inputs,
            |inputs| SharedQueuePool.execute(Job::new(lookup, inputs).with_workers(workers)),
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("rayon", |b| {
        b.iter_batched(
            random_inputs,
            |inputs| RayonPool.execute(Job::new(lookup, inputs).with_workers(workers)),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, execute_bench);
criterion_main!(benches);
