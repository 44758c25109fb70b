//! The thread-pool interface served to a downstream compute library.
//!
//! `PoolAdapter` is the externally-visible scheduling entry point. It owns
//! no threads of its own; it decides how many workers a fan-out uses,
//! whether the last chunk runs inline on the calling thread, and submits
//! the remaining chunks to the underlying [`TaskPool`].

use crate::counter::Counter;
use crate::jobs::run_jobs;
use crate::pool::TaskPool;
use crate::task::Task;
use crate::InlinePolicy;
use std::sync::Arc;
use std::thread;

/// Capability bit: chunk callbacks may run asynchronously relative to the
/// `parallel_for` submission, even though the call as a whole blocks.
pub const ASYNCHRONOUS: u64 = 1;

/// The fixed contract a downstream compute library expects from a thread
/// pool.
pub trait ThreadPoolIface {
    /// Number of worker threads available to one fan-out.
    fn num_threads(&self) -> usize;

    /// Whether the calling thread is currently inside a pool-managed task.
    /// Nested callers use this to detect re-entrancy.
    fn in_parallel(&self) -> bool;

    /// Capability flags advertised to the consumer.
    fn flags(&self) -> u64;

    /// Fans `n` units of work out across the pool and blocks until every
    /// unit has been visited exactly once.
    ///
    /// The callback receives `(unit_index, n)` and may be invoked
    /// concurrently from several threads with disjoint unit indices.
    fn parallel_for<F>(&self, n: usize, f: F)
    where
        F: Fn(usize, usize) + Send + Sync + 'static;
}

/// Construction-time configuration for [`PoolAdapter`].
///
/// Everything here is read once when the adapter is built; nothing is
/// re-read from the environment per call.
#[derive(Debug, Clone, Default)]
pub struct AdapterOptions {
    /// Upper bound on the worker threads a fan-out may use. `None` uses
    /// every thread the underlying pool has.
    pub max_threads: Option<usize>,
    /// When to run the last chunk inline on the calling thread.
    pub inline_policy: InlinePolicy,
}

/// Adapts an application [`TaskPool`] to the [`ThreadPoolIface`] contract.
///
/// Create one per execution scope (e.g. one kernel invocation). The
/// configuration is immutable once built; reconfiguring while a fan-out is
/// in flight is not representable.
pub struct PoolAdapter<P: TaskPool> {
    pool: Arc<P>,
    num_threads: usize,
    use_caller_thread: bool,
}

impl<P: TaskPool> PoolAdapter<P> {
    /// Creates an adapter using every thread of `pool` and the default
    /// inline policy.
    pub fn new(pool: Arc<P>) -> Self {
        Self::with_options(pool, AdapterOptions::default())
    }

    /// Creates an adapter with explicit options.
    ///
    /// An effective thread count of zero cannot schedule anything and is
    /// treated as a contract violation.
    pub fn with_options(pool: Arc<P>, options: AdapterOptions) -> Self {
        let mut num_threads = pool.thread_count();
        if let Some(cap) = options.max_threads {
            num_threads = num_threads.min(cap);
        }
        assert!(num_threads >= 1, "adapter requires at least one worker thread");

        let schedulable_cpus = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let use_caller_thread = match options.inline_policy {
            InlinePolicy::Auto => num_threads == schedulable_cpus,
            InlinePolicy::Always => true,
            InlinePolicy::Never => false,
        };

        PoolAdapter {
            pool,
            num_threads,
            use_caller_thread,
        }
    }

    /// Number of worker threads available to one fan-out.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Whether the calling thread is currently inside a pool-managed task.
    pub fn in_parallel(&self) -> bool {
        self.pool.in_pool()
    }

    /// Capability flags advertised to the consumer.
    pub fn flags(&self) -> u64 {
        ASYNCHRONOUS
    }

    /// Whether fan-outs run their last chunk inline on the calling thread.
    pub fn uses_caller_thread(&self) -> bool {
        self.use_caller_thread
    }

    /// Fans `n` units of work out across the pool and blocks until every
    /// unit has been visited exactly once.
    pub fn parallel_for<F>(&self, n: usize, f: F)
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        if n == 0 {
            return;
        }

        // Single unit: skip all scheduling overhead.
        if n == 1 {
            f(0, 1);
            return;
        }

        let nthr = self.num_threads;
        let njobs = n.min(nthr);
        let balance = nthr < n;

        // With use_caller_thread, schedule njobs-1 chunks to the pool and
        // run the last chunk directly.
        let njobs_to_schedule = if self.use_caller_thread {
            njobs - 1
        } else {
            njobs
        };
        tracing::trace!(n, njobs, balance, scheduled = njobs_to_schedule, "fan-out");

        let pending = Counter::new(njobs_to_schedule);
        let f = Arc::new(f);
        for i in 0..njobs_to_schedule {
            let f = Arc::clone(&f);
            let task = Task::with_counter(
                move || run_jobs(balance, i, n, njobs, f.as_ref()),
                pending.clone(),
            );
            self.pool.schedule_with_hint(task, i);
        }
        if self.use_caller_thread {
            run_jobs(balance, njobs - 1, n, njobs, f.as_ref());
        }

        self.pool.wait_for_counter(&pending);
    }
}

impl<P: TaskPool> ThreadPoolIface for PoolAdapter<P> {
    fn num_threads(&self) -> usize {
        PoolAdapter::num_threads(self)
    }

    fn in_parallel(&self) -> bool {
        PoolAdapter::in_parallel(self)
    }

    fn flags(&self) -> u64 {
        PoolAdapter::flags(self)
    }

    fn parallel_for<F>(&self, n: usize, f: F)
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        PoolAdapter::parallel_for(self, n, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerPool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn adapter_with(
        threads: usize,
        policy: InlinePolicy,
    ) -> (Arc<WorkerPool>, PoolAdapter<WorkerPool>) {
        let pool = Arc::new(WorkerPool::new(threads));
        let adapter = PoolAdapter::with_options(
            Arc::clone(&pool),
            AdapterOptions {
                inline_policy: policy,
                ..Default::default()
            },
        );
        (pool, adapter)
    }

    // The downstream library only ever sees the trait surface.
    fn drive<T: ThreadPoolIface>(tp: &T, n: usize) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        tp.parallel_for(n, move |_unit, _n| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count.load(Ordering::SeqCst)
    }

    #[test]
    fn test_consumer_drives_through_the_interface() {
        let (pool, adapter) = adapter_with(2, InlinePolicy::Never);
        assert!(ThreadPoolIface::num_threads(&adapter) >= 1);
        assert_eq!(drive(&adapter, 37), 37);
        pool.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_zero_units_never_invokes_callback() {
        let (pool, adapter) = adapter_with(2, InlinePolicy::Never);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        adapter.parallel_for(0, move |_i, _n| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        pool.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_single_unit_runs_on_calling_thread() {
        let (pool, adapter) = adapter_with(2, InlinePolicy::Never);
        let observed = Arc::new(Mutex::new(None));
        let o = observed.clone();

        adapter.parallel_for(1, move |unit, n| {
            *o.lock().unwrap() = Some((unit, n, thread::current().id()));
        });

        let observed = observed.lock().unwrap();
        assert_eq!(
            *observed,
            Some((0, 1, thread::current().id())),
            "single-unit dispatch must stay synchronous"
        );
        pool.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_max_threads_caps_worker_count() {
        let pool = Arc::new(WorkerPool::new(4));
        let adapter = PoolAdapter::with_options(
            Arc::clone(&pool),
            AdapterOptions {
                max_threads: Some(2),
                inline_policy: InlinePolicy::Never,
            },
        );
        assert_eq!(adapter.num_threads(), 2);
        pool.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_cap_above_pool_size_is_ignored() {
        let pool = Arc::new(WorkerPool::new(2));
        let adapter = PoolAdapter::with_options(
            Arc::clone(&pool),
            AdapterOptions {
                max_threads: Some(16),
                inline_policy: InlinePolicy::Never,
            },
        );
        assert_eq!(adapter.num_threads(), 2);
        pool.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_flags_report_asynchronous_dispatch() {
        let (pool, adapter) = adapter_with(1, InlinePolicy::Never);
        assert_ne!(adapter.flags() & ASYNCHRONOUS, 0);
        pool.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_inline_policy_overrides() {
        let (pool_a, always) = adapter_with(2, InlinePolicy::Always);
        assert!(always.uses_caller_thread());
        let (pool_b, never) = adapter_with(2, InlinePolicy::Never);
        assert!(!never.uses_caller_thread());
        pool_a.shutdown().expect("shutdown failed");
        pool_b.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_not_in_parallel_on_caller_thread() {
        let (pool, adapter) = adapter_with(2, InlinePolicy::Never);
        assert!(!adapter.in_parallel());
        pool.shutdown().expect("shutdown failed");
    }

    #[test]
    #[should_panic(expected = "at least one worker thread")]
    fn test_zero_effective_threads_is_fatal() {
        let pool = Arc::new(WorkerPool::new(2));
        let _ = PoolAdapter::with_options(
            pool,
            AdapterOptions {
                max_threads: Some(0),
                inline_policy: InlinePolicy::Never,
            },
        );
    }
}
