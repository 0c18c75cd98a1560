//! Worker pool sizing and timeouts.
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Configuration for the background worker pool.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PoolConf {
    /// Maximum number of tasks waiting in the queue before submissions have to wait.
    #[serde(default = "PoolConf::default_queue_capacity")]
    pub queue_capacity: usize,

    /// Time, in seconds, queued and running tasks have to complete once the pool is stopped.
    #[serde(default = "PoolConf::default_stop_grace_sec")]
    pub stop_grace_sec: u64,

    /// Time, in milliseconds, submissions wait for queue space when the caller set no deadline.
    #[serde(default = "PoolConf::default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,

    /// Time, in seconds, a single task is allowed to run before it is abandoned.
    #[serde(default = "PoolConf::default_task_timeout_sec")]
    pub task_timeout_sec: u64,

    /// Number of workers executing tasks concurrently.
    #[serde(default = "PoolConf::default_workers")]
    pub workers: usize,
}

impl Default for PoolConf {
    fn default() -> Self {
        PoolConf {
            queue_capacity: PoolConf::default_queue_capacity(),
            stop_grace_sec: PoolConf::default_stop_grace_sec(),
            submit_timeout_ms: PoolConf::default_submit_timeout_ms(),
            task_timeout_sec: PoolConf::default_task_timeout_sec(),
            workers: PoolConf::default_workers(),
        }
    }
}

impl PoolConf {
    /// Grace period granted to queued and running tasks on stop.
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_sec)
    }

    /// Maximum wait for queue space when the submitting context has no deadline.
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    /// Maximum execution time of individual tasks.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_sec)
    }
}

impl PoolConf {
    fn default_queue_capacity() -> usize {
        256
    }

    fn default_stop_grace_sec() -> u64 {
        10
    }

    fn default_submit_timeout_ms() -> u64 {
        1000
    }

    fn default_task_timeout_sec() -> u64 {
        30
    }

    fn default_workers() -> usize {
        let parallel = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(8);
        parallel * 2
    }
}
