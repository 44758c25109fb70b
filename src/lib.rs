//! # Fanout - Balanced Work-Distribution Scheduler
//!
//! A scheduling bridge between an application-level thread pool and the
//! fixed thread-pool contract a downstream compute library expects. Given
//! `n` independent, equal-cost units of work, the adapter partitions them
//! into at most `T` contiguous ranges (one per available worker), dispatches
//! each range onto the underlying pool, and optionally runs the last range
//! inline on the calling thread to save one scheduling hop.
//!
//! ## Architecture
//!
//! - **Partitioner**: `balance211`, a pure function computing the fair
//!   contiguous range for one worker out of `n` units and `team` workers
//! - **Range Executor**: `run_jobs`, invoking the work callback once per
//!   unit of a worker's range
//! - **Pool Adapter**: `PoolAdapter`, the `parallel_for` entry point that
//!   decides worker count, caller-thread execution, and blocks until every
//!   chunk has completed
//! - **Worker Pool**: a reference `TaskPool` implementation backed by a
//!   global injector and per-worker queues
//!
//! ## Example
//!
//! ```
//! use fanout::{PoolAdapter, WorkerPool};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let pool = Arc::new(WorkerPool::new(4));
//! let adapter = PoolAdapter::new(Arc::clone(&pool));
//!
//! let visited = Arc::new(AtomicUsize::new(0));
//! let v = visited.clone();
//! adapter.parallel_for(100, move |_unit, _n| {
//!     v.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert_eq!(visited.load(Ordering::SeqCst), 100);
//! pool.shutdown().expect("shutdown failed");
//! ```

pub mod adapter;
pub mod counter;
pub mod jobs;
pub mod partition;
pub mod pool;
pub mod task;

use serde::{Deserialize, Serialize};

/// Policy for running the last work chunk inline on the calling thread.
///
/// Running one chunk on the caller trades a cross-thread handoff for inline
/// execution on an already-hot thread. It pays off when the pool is not
/// oversubscribed relative to hardware, which is what `Auto` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InlinePolicy {
    /// Inline the last chunk iff the configured thread count equals the
    /// number of hardware-schedulable CPUs.
    #[default]
    Auto,
    /// Always run the last chunk on the calling thread.
    Always,
    /// Always hand every chunk to the pool.
    Never,
}

pub use adapter::{AdapterOptions, PoolAdapter, ThreadPoolIface, ASYNCHRONOUS};
pub use counter::Counter;
pub use jobs::run_jobs;
pub use partition::balance211;
pub use pool::{PoolError, TaskPool, WorkerPool};
pub use task::Task;
