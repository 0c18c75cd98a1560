//! Bounded, in-memory worker pool for fire-and-forget background work.
//!
//! Request handlers use the pool to run work that must not delay their response,
//! such as propagating changes to external services once the primary change is stored.
//!
//! The pool is best-effort by design:
//!
//! - Tasks live only in memory: there is no persistence or redelivery.
//! - Submitters get no result back: tasks handle (and report) their own failures.
//! - Tasks are not ordered with respect to each other.
pub mod conf;
pub mod error;

mod pool;
mod task;
mod telemetry;

#[cfg(test)]
mod tests;

pub use self::conf::PoolConf;
pub use self::pool::PoolStats;
pub use self::pool::StopOutcome;
pub use self::pool::WorkerPool;
pub use self::task::Task;
pub use self::task::TaskOutcome;
pub use self::telemetry::register_metrics;
