//! Errors reported by the worker pool.
use std::time::Duration;

/// The pool queue stayed full for longer than the submitter was willing to wait.
#[derive(Debug, thiserror::Error)]
#[error("worker pool queue remained full for {0:?}, task not submitted")]
pub struct PoolSaturated(Duration);

impl PoolSaturated {
    /// Report the queue was still full after waiting for the given time.
    pub fn new(waited: Duration) -> PoolSaturated {
        PoolSaturated(waited)
    }
}

/// The pool was stopped and no longer accepts tasks.
#[derive(Debug, thiserror::Error)]
#[error("worker pool is stopped and no longer accepts tasks")]
pub struct PoolStopped;

/// A task panicked during execution.
#[derive(Debug, thiserror::Error)]
#[error("task '{task}' panicked: {message}")]
pub struct TaskPanicked {
    pub message: String,
    pub task: &'static str,
}

/// A task did not complete within the allowed execution time.
#[derive(Debug, thiserror::Error)]
#[error("task '{task}' did not complete within {timeout:?}")]
pub struct TaskTimedOut {
    pub task: &'static str,
    pub timeout: Duration,
}
