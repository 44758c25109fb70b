//! Task definition and execution logic.
//!
//! Tasks are the units a pool schedules: a closure to run plus an optional
//! completion counter decremented once the closure has finished.

use crate::counter::Counter;

/// A unit of schedulable work.
pub struct Task {
    /// The work to be executed
    work: Box<dyn FnOnce() + Send + 'static>,
    /// Optional counter to decrement when the task completes
    completion: Option<Counter>,
}

impl Task {
    /// Creates a new task with the given work function.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            work: Box::new(work),
            completion: None,
        }
    }

    /// Creates a new task with an associated completion counter.
    pub fn with_counter<F>(work: F, counter: Counter) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            work: Box::new(work),
            completion: Some(counter),
        }
    }

    /// Executes the task and decrements its counter if present.
    pub fn execute(self) {
        (self.work)();

        if let Some(counter) = self.completion {
            counter.decrement();
        }
    }
}
