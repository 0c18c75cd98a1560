//! Units of work executed by the pool and the outcome of their execution.
use std::fmt;
use std::future::Future;

use anyhow::Error;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use opentelemetry_api::Context as OTelContext;
use slog::Logger;

use authsync_context::Context;

use crate::error::TaskPanicked;
use crate::error::TaskTimedOut;

/// A deferred unit of work to run on the pool.
///
/// Tasks own everything they need to run: the pool does not track their identity,
/// only how many are waiting, how many are running and how they ended.
/// A task that needs to report a failure in detail is expected to log it itself
/// (the logger of the [`Context`] given to [`Task::new`] is the natural place to do so).
pub struct Task {
    pub(crate) logger: Logger,
    pub(crate) name: &'static str,
    pub(crate) trace: OTelContext,
    pub(crate) work: BoxFuture<'static, Result<()>>,
}

impl Task {
    /// Wrap a future into a [`Task`] for the pool to execute.
    ///
    /// The current OpenTelemetry context is captured so task spans are linked to
    /// the operation that submitted them.
    pub fn new<F>(context: &Context, name: &'static str, work: F) -> Task
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Task {
            logger: context.logger.new(slog::o!("task" => name)),
            name,
            trace: OTelContext::current(),
            work: work.boxed(),
        }
    }

    /// Name of the task, used in logs and spans.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

/// How the execution of a [`Task`] ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskOutcome {
    /// The task returned an error.
    Failed,

    /// The task panicked.
    Panicked,

    /// The task completed without error.
    Success,

    /// The task did not complete within the configured execution time.
    TimedOut,
}

impl TaskOutcome {
    /// Label used to report the outcome in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Failed => "failed",
            TaskOutcome::Panicked => "panicked",
            TaskOutcome::Success => "success",
            TaskOutcome::TimedOut => "timed_out",
        }
    }
}

impl From<&Result<()>> for TaskOutcome {
    fn from(value: &Result<()>) -> Self {
        match value {
            Ok(()) => TaskOutcome::Success,
            Err(error) if is_kind::<TaskPanicked>(error) => TaskOutcome::Panicked,
            Err(error) if is_kind::<TaskTimedOut>(error) => TaskOutcome::TimedOut,
            Err(_) => TaskOutcome::Failed,
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_kind<E>(error: &Error) -> bool
where
    E: std::error::Error + Send + Sync + 'static,
{
    error.is::<E>() || error.chain().any(|cause| cause.is::<E>())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;

    use super::TaskOutcome;
    use crate::error::TaskPanicked;
    use crate::error::TaskTimedOut;

    #[test]
    fn outcome_from_result() {
        let ok: Result<()> = Ok(());
        assert_eq!(TaskOutcome::from(&ok), TaskOutcome::Success);

        let failed: Result<()> = Err(anyhow::anyhow!("test error"));
        assert_eq!(TaskOutcome::from(&failed), TaskOutcome::Failed);

        let panicked: Result<()> = Err(anyhow::anyhow!(TaskPanicked {
            message: "boom".into(),
            task: "test",
        }));
        assert_eq!(TaskOutcome::from(&panicked), TaskOutcome::Panicked);

        let timeout = TaskTimedOut {
            task: "test",
            timeout: Duration::from_millis(10),
        };
        let timed_out: Result<()> = Err(anyhow::anyhow!("wrapped").context(timeout));
        assert_eq!(TaskOutcome::from(&timed_out), TaskOutcome::TimedOut);
    }

    #[test]
    fn outcome_from_wrapped_cause() {
        let panicked = TaskPanicked {
            message: "boom".into(),
            task: "test",
        };
        let error: Result<()> = Err(anyhow::Error::new(panicked).context("running task"));
        assert_eq!(TaskOutcome::from(&error), TaskOutcome::Panicked);
    }
}
