//! Fan-out dispatch benchmarks using criterion.
//!
//! Measures the pure partition arithmetic and the end-to-end cost of a
//! blocking fan-out at several work sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fanout::{balance211, PoolAdapter, WorkerPool};
use std::sync::Arc;

fn bench_balance211(c: &mut Criterion) {
    c.bench_function("balance211_16_way", |b| {
        b.iter(|| {
            let n = std::hint::black_box(1_000_003usize);
            for tid in 0..16 {
                std::hint::black_box(balance211(n, 16, tid));
            }
        })
    });
}

fn bench_parallel_for(c: &mut Criterion) {
    let num_threads = num_cpus::get();
    let pool = Arc::new(WorkerPool::new(num_threads));
    let adapter = PoolAdapter::new(Arc::clone(&pool));

    // Warmup
    adapter.parallel_for(num_threads * 100, |_unit, _n| {
        std::hint::black_box(());
    });

    let mut group = c.benchmark_group("parallel_for");
    for n in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(BenchmarkId::new("fan_out", n), |b| {
            b.iter(|| {
                adapter.parallel_for(n, |unit, _n| {
                    std::hint::black_box(unit);
                });
            })
        });
    }
    group.finish();

    pool.shutdown().expect("shutdown failed");
}

criterion_group!(benches, bench_balance211, bench_parallel_for);
criterion_main!(benches);
