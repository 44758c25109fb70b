//! Worker pool consumed by the scheduler adapter.
//!
//! The adapter only ever talks to the narrow [`TaskPool`] contract; the
//! [`WorkerPool`] here is the reference implementation backing tests, the
//! demo binary, and any embedder without a pool of its own. Worker threads
//! continuously pull tasks from a shared injector into a small local queue
//! and execute them.

use crate::counter::Counter;
use crate::task::Task;
use crossbeam::deque::{Injector, Steal, Worker as Deque};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Error reported by pool lifecycle operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// One or more worker threads panicked before they could be joined.
    #[error("{0} worker thread(s) panicked")]
    WorkersPanicked(usize),
}

/// The contract the scheduler adapter consumes from a host thread pool.
///
/// Scheduling is fire-and-forget: once submitted, a task runs to completion
/// and the pool owns its execution timing. The placement hint is advisory.
pub trait TaskPool {
    /// Number of worker threads the pool runs.
    fn thread_count(&self) -> usize;

    /// Submits a task, with an advisory placement hint.
    fn schedule_with_hint(&self, task: Task, hint: usize);

    /// Whether the calling thread is one of this pool's workers.
    fn in_pool(&self) -> bool;

    /// Blocks until `counter` reaches zero.
    ///
    /// When called from a pool worker the implementation must keep pending
    /// tasks moving while it waits, so that a fan-out issued from inside
    /// another fan-out cannot deadlock the pool.
    fn wait_for_counter(&self, counter: &Counter);
}

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    // Id of the pool owning the current thread, 0 when not a pool worker.
    static CURRENT_POOL: Cell<usize> = Cell::new(0);
}

/// A worker thread that executes tasks from the pool's queues.
struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Creates and starts a new worker thread.
    ///
    /// The worker drains its local queue first and refills it in batches
    /// from the global injector when it runs dry.
    fn new(
        id: usize,
        pool_id: usize,
        local_queue: Deque<Task>,
        injector: Arc<Injector<Task>>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::spawn(move || {
            CURRENT_POOL.with(|current| current.set(pool_id));
            Worker::run_loop(local_queue, injector, shutdown);
        });

        Worker {
            id,
            handle: Some(handle),
        }
    }

    /// Main execution loop for the worker thread.
    fn run_loop(local_queue: Deque<Task>, injector: Arc<Injector<Task>>, shutdown: Arc<AtomicBool>) {
        loop {
            // Check for shutdown signal
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Try the local queue first, then refill from the injector
            let task = local_queue.pop().or_else(|| loop {
                match injector.steal_batch_and_pop(&local_queue) {
                    Steal::Success(task) => return Some(task),
                    Steal::Empty => return None,
                    Steal::Retry => continue,
                }
            });

            match task {
                Some(task) => task.execute(),
                None => {
                    // No work available, yield to prevent busy-waiting
                    thread::yield_now();
                }
            }
        }
    }

    /// Waits for the worker thread to finish.
    fn join(mut self) -> thread::Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.join()
        } else {
            Ok(())
        }
    }
}

/// A pool of worker threads fed from a shared global injector.
pub struct WorkerPool {
    id: usize,
    size: usize,
    workers: Mutex<Vec<Worker>>,
    injector: Arc<Injector<Task>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Creates a new worker pool with the specified number of threads.
    ///
    /// A pool with zero threads cannot make progress, so that is treated as
    /// a contract violation and fails fast.
    pub fn new(num_threads: usize) -> Self {
        assert!(num_threads >= 1, "worker pool requires at least one thread");

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(num_threads);
        for worker_id in 0..num_threads {
            workers.push(Worker::new(
                worker_id,
                id,
                Deque::new_fifo(),
                Arc::clone(&injector),
                Arc::clone(&shutdown),
            ));
        }

        WorkerPool {
            id,
            size: num_threads,
            workers: Mutex::new(workers),
            injector,
            shutdown,
        }
    }

    /// Returns the number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Submits a task for execution.
    ///
    /// The reference pool feeds a single shared injector, so the hint is
    /// recorded but not acted on. Submitting to a pool that has been shut
    /// down is a contract violation by the caller.
    pub fn schedule_with_hint(&self, task: Task, hint: usize) {
        assert!(
            !self.shutdown.load(Ordering::Relaxed),
            "task scheduled on a terminated pool"
        );
        tracing::trace!(pool = self.id, hint, "scheduling task");
        self.injector.push(task);
    }

    /// Whether the calling thread is one of this pool's workers.
    pub fn in_pool(&self) -> bool {
        CURRENT_POOL.with(|current| current.get()) == self.id
    }

    /// Blocks until `counter` reaches zero.
    ///
    /// On a pool worker this keeps executing pending tasks while it waits,
    /// which is what lets nested fan-outs complete even when every worker is
    /// parked on an inner counter. On any other thread it spins briefly and
    /// falls back to a sleep loop with exponential backoff.
    pub fn wait_for_counter(&self, counter: &Counter) {
        if counter.is_complete() {
            return;
        }

        // Adaptive spinning phase before anything heavier.
        const SPIN_LIMIT: usize = 5000;
        let mut spin_count = 0;
        while !counter.is_complete() && spin_count < SPIN_LIMIT {
            std::hint::spin_loop();
            spin_count += 1;
        }

        if self.in_pool() {
            while !counter.is_complete() {
                match self.injector.steal() {
                    Steal::Success(task) => task.execute(),
                    Steal::Retry => continue,
                    Steal::Empty => thread::yield_now(),
                }
            }
        } else {
            let mut backoff_us = 1;
            const MAX_BACKOFF_US: u64 = 1000;

            while !counter.is_complete() {
                thread::sleep(Duration::from_micros(backoff_us));
                backoff_us = (backoff_us * 2).min(MAX_BACKOFF_US);
            }
        }
    }

    /// Shuts down the pool and waits for all worker threads to finish.
    ///
    /// Outstanding tasks are drained before the workers are signaled.
    /// Idempotent: repeated calls (including the one from `Drop`) return Ok.
    pub fn shutdown(&self) -> Result<(), PoolError> {
        let workers: Vec<Worker> = {
            let mut guard = self.workers.lock().unwrap();
            guard.drain(..).collect()
        };
        if workers.is_empty() {
            return Ok(());
        }

        // Wait for all submitted tasks to be picked up
        while !self.injector.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }

        // Give workers a moment to finish their current tasks
        thread::sleep(Duration::from_millis(10));

        self.shutdown.store(true, Ordering::Relaxed);

        let mut failed_count = 0;
        for worker in workers {
            let worker_id = worker.id;
            if worker.join().is_err() {
                failed_count += 1;
                tracing::error!(worker = worker_id, "worker panicked during execution");
            }
        }

        if failed_count > 0 {
            Err(PoolError::WorkersPanicked(failed_count))
        } else {
            Ok(())
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl TaskPool for WorkerPool {
    fn thread_count(&self) -> usize {
        self.size()
    }

    fn schedule_with_hint(&self, task: Task, hint: usize) {
        WorkerPool::schedule_with_hint(self, task, hint);
    }

    fn in_pool(&self) -> bool {
        WorkerPool::in_pool(self)
    }

    fn wait_for_counter(&self, counter: &Counter) {
        WorkerPool::wait_for_counter(self, counter);
    }
}
