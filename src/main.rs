use fanout::{PoolAdapter, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Fanout - Balanced Work-Distribution Scheduler\n");

    let num_threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let pool = Arc::new(WorkerPool::new(num_threads));
    let adapter = PoolAdapter::new(Arc::clone(&pool));
    println!("Initialized worker pool with {} threads\n", num_threads);

    // Example 1: single-unit fast path
    println!("Example 1: Single-unit dispatch");
    adapter.parallel_for(1, |unit, n| {
        println!("  unit {} of {} ran inline on the calling thread", unit, n);
    });
    println!();

    // Example 2: balanced fan-out
    println!("Example 2: Balanced fan-out");
    let sum = Arc::new(AtomicUsize::new(0));
    let n = 100_000;

    let start = Instant::now();
    let sum_clone = sum.clone();
    adapter.parallel_for(n, move |unit, _n| {
        sum_clone.fetch_add(unit, Ordering::Relaxed);
    });
    let duration = start.elapsed();

    let expected: usize = n * (n - 1) / 2;
    println!("  Dispatched {} units in {:?}", n, duration);
    println!(
        "  Sum result: {} (expected: {})\n",
        sum.load(Ordering::SeqCst),
        expected
    );

    // Example 3: dispatch throughput
    println!("Example 3: Fan-out throughput");
    let rounds = 1_000;
    let start = Instant::now();
    for _ in 0..rounds {
        adapter.parallel_for(num_threads * 4, |_unit, _n| {});
    }
    let duration = start.elapsed();
    let per_second = rounds as f64 / duration.as_secs_f64();
    println!("  Completed {} fan-outs in {:?}", rounds, duration);
    println!("  Throughput: {:.2} fan-outs/second\n", per_second);

    println!("Shutting down worker pool...");
    match pool.shutdown() {
        Ok(_) => println!("Done!"),
        Err(e) => eprintln!("Shutdown error: {}", e),
    }
}
