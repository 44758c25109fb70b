//! Counter-based synchronization primitive for task completion tracking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct InnerCounter {
    value: AtomicUsize,
}

/// A thread-safe counter for tracking outstanding task completions.
///
/// A fan-out creates one counter sized to the number of scheduled chunks;
/// each chunk decrements it when done, and the dispatcher waits for zero.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<InnerCounter>,
}

impl Counter {
    /// Creates a new counter with the specified initial value.
    pub fn new(initial: usize) -> Self {
        Counter {
            inner: Arc::new(InnerCounter {
                value: AtomicUsize::new(initial),
            }),
        }
    }

    /// Increments the counter by one.
    pub fn increment(&self) {
        self.inner.value.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrements the counter by one.
    ///
    /// Returns true if the counter reached zero. Release ordering so that
    /// all work done before the decrement is visible to whoever observes
    /// completion.
    pub fn decrement(&self) -> bool {
        self.inner.value.fetch_sub(1, Ordering::Release) == 1
    }

    /// Returns the current value of the counter.
    pub fn value(&self) -> usize {
        self.inner.value.load(Ordering::SeqCst)
    }

    /// Checks if the counter has reached zero.
    pub fn is_complete(&self) -> bool {
        self.value() == 0
    }
}
