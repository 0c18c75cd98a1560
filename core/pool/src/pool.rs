//! Fixed-size pool of workers draining a shared task queue.
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use futures::StreamExt;
use opentelemetry_api::trace::FutureExt as TraceFutureExt;
use opentelemetry_api::trace::SpanKind;
use opentelemetry_api::trace::TraceContextExt;
use opentelemetry_api::trace::Tracer;
use slog::Logger;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use replisdk::utils::error::slog::ErrorAttributes;
use replisdk::utils::trace::TraceFutureErrExt;

use authsync_context::Context;

use crate::conf::PoolConf;
use crate::error::PoolSaturated;
use crate::error::PoolStopped;
use crate::error::TaskPanicked;
use crate::error::TaskTimedOut;
use crate::task::Task;
use crate::task::TaskOutcome;
use crate::telemetry::ACTIVE_TASKS;
use crate::telemetry::EXECUTE_COUNT;
use crate::telemetry::QUEUE_DEPTH;
use crate::telemetry::STOP_ABANDONED;
use crate::telemetry::SUBMIT_COUNT;
use crate::telemetry::SUBMIT_ERR;
use crate::telemetry::TRACER;

/// Execute submitted [`Task`]s in the background with bounded parallelism.
///
/// ## Workers and queue
///
/// A fixed number of workers is spawned onto the tokio runtime when the pool starts.
/// Workers share a single bounded queue and loop pulling the next task, executing it and
/// recording its outcome until the queue is closed and empty.
///
/// Tasks are independent of each other: no ordering is guaranteed between them,
/// not even between two tasks submitted one after the other by the same caller.
///
/// ## Submission and backpressure
///
/// Submitting a task never waits for the task to execute.
/// When the queue is full [`WorkerPool::submit`] waits for space, but only until the
/// deadline of the submitting [`Context`] (or [`PoolConf::submit_timeout`] if the
/// context has no deadline) after which a [`PoolSaturated`] error is returned.
///
/// ## Failures
///
/// Errors returned by tasks are counted and otherwise ignored: tasks are expected
/// to report their own failures. Panics and timeouts are caught and logged by the pool.
/// In all cases the worker moves on to the next task.
///
/// ## Shutdown
///
/// [`WorkerPool::stop`] closes the queue, lets workers drain queued tasks and waits for them
/// up to [`PoolConf::stop_grace`]. Workers still busy after that are aborted.
#[derive(Clone)]
pub struct WorkerPool(Arc<PoolShared>);

impl WorkerPool {
    /// Spawn the pool workers and return a handle to submit tasks to them.
    ///
    /// ## Panics
    ///
    /// Workers are spawned with [`tokio::spawn`] so this method panics
    /// if called outside of a tokio runtime.
    pub fn start(context: &Context, conf: PoolConf) -> WorkerPool {
        let workers = conf.workers.max(1);
        let (sender, receiver) = mpsc::channel(conf.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let task_timeout = conf.task_timeout();
        let handles = (0..workers)
            .map(|id| {
                let worker = Worker {
                    counters: counters.clone(),
                    logger: context.logger.new(slog::o!("worker" => id)),
                    receiver: receiver.clone(),
                    task_timeout,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        slog::info!(
            context.logger, "Worker pool started";
            "workers" => workers,
            "queue_capacity" => conf.queue_capacity,
        );
        WorkerPool(Arc::new(PoolShared {
            conf,
            counters,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            worker_count: workers,
        }))
    }

    /// Snapshot of the pool activity.
    pub fn stats(&self) -> PoolStats {
        let counters = &self.0.counters;
        PoolStats {
            active: counters.active.load(Ordering::Acquire),
            completed: counters.completed.load(Ordering::Acquire),
            queued: counters.queued.load(Ordering::Acquire),
            workers: self.0.worker_count,
        }
    }

    /// Stop accepting tasks and wait for queued and running ones to complete.
    ///
    /// Tasks still running once the grace period expires are aborted.
    /// Calling this method after the pool is stopped has no effect.
    pub async fn stop(&self, context: &Context) -> StopOutcome {
        let sender = self
            .0
            .sender
            .lock()
            .expect("WorkerPool sender lock poisoned")
            .take();
        let workers = std::mem::take(
            &mut *self
                .0
                .workers
                .lock()
                .expect("WorkerPool workers lock poisoned"),
        );
        if sender.is_none() && workers.is_empty() {
            return StopOutcome::AlreadyStopped;
        }

        // Dropping the sender closes the queue once in-flight submissions are done.
        drop(sender);
        let grace = self.0.conf.stop_grace();
        slog::info!(
            context.logger, "Stopping worker pool";
            "queued" => self.stats().queued,
            "grace_sec" => grace.as_secs(),
        );

        let mut workers: FuturesUnordered<JoinHandle<()>> = workers.into_iter().collect();
        let drain = async {
            while let Some(result) = workers.next().await {
                if let Err(error) = result {
                    let error = anyhow::Error::from(error);
                    slog::warn!(
                        context.logger, "Pool worker exited abnormally";
                        ErrorAttributes::from(&error),
                    );
                }
            }
        };
        let drained = tokio::time::timeout(grace, drain).await.is_ok();
        if drained {
            slog::info!(context.logger, "Worker pool drained and stopped");
            return StopOutcome::Drained;
        }

        // Grace period expired: abort the workers and whatever they are running.
        let active = self.stats().active;
        for worker in workers.iter() {
            worker.abort();
        }
        // Once every worker is gone nothing dequeues and tasks left in the channel are dropped.
        while workers.next().await.is_some() {}
        let queued = self.0.counters.queued.swap(0, Ordering::AcqRel);
        QUEUE_DEPTH.sub(queued as i64);
        STOP_ABANDONED.inc_by((active + queued) as f64);
        slog::warn!(
            context.logger, "Worker pool stop grace period expired, abandoning tasks";
            "active" => active,
            "queued" => queued,
        );
        StopOutcome::Abandoned { active, queued }
    }

    /// Queue a [`Task`] for background execution.
    ///
    /// The method returns as soon as the task is queued, it does not wait for execution.
    /// Errors are returned only when the task could not be queued:
    ///
    /// - [`PoolStopped`] if the pool no longer accepts tasks.
    /// - [`PoolSaturated`] if the queue stayed full until the submission deadline.
    pub async fn submit(&self, context: &Context, task: Task) -> Result<()> {
        let sender = self
            .0
            .sender
            .lock()
            .expect("WorkerPool sender lock poisoned")
            .clone();
        let sender = match sender {
            Some(sender) => sender,
            None => {
                SUBMIT_ERR.with_label_values(&["stopped"]).inc();
                anyhow::bail!(PoolStopped);
            }
        };

        SUBMIT_COUNT.inc();
        let name = task.name();
        let wait = context
            .remaining()
            .unwrap_or_else(|| self.0.conf.submit_timeout());

        // Only tasks holding a queue slot count as queued, blocked submitters do not.
        let error = match tokio::time::timeout(wait, sender.reserve()).await {
            Ok(Ok(permit)) => {
                self.0.counters.queued.fetch_add(1, Ordering::AcqRel);
                QUEUE_DEPTH.inc();
                permit.send(task);
                return Ok(());
            }
            Ok(Err(_)) => {
                SUBMIT_ERR.with_label_values(&["stopped"]).inc();
                anyhow::anyhow!(PoolStopped)
            }
            Err(_) => {
                SUBMIT_ERR.with_label_values(&["saturated"]).inc();
                anyhow::anyhow!(PoolSaturated::new(wait))
            }
        };

        slog::warn!(
            context.logger, "Unable to submit task to worker pool";
            "task" => name,
            ErrorAttributes::from(&error),
        );
        Err(error)
    }
}

/// Snapshot of [`WorkerPool`] activity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolStats {
    /// Number of tasks currently executing.
    pub active: usize,

    /// Number of tasks that finished executing, regardless of their outcome.
    pub completed: u64,

    /// Number of tasks submitted and waiting for a worker.
    pub queued: usize,

    /// Number of workers in the pool.
    pub workers: usize,
}

/// Result of a [`WorkerPool::stop`] request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopOutcome {
    /// Tasks were still running or queued when the grace period expired and were abandoned.
    Abandoned { active: usize, queued: usize },

    /// The pool was already stopped by an earlier call.
    AlreadyStopped,

    /// All queued and running tasks completed.
    Drained,
}

/// Activity counters shared by the pool handle and its workers.
#[derive(Default)]
struct Counters {
    active: AtomicUsize,
    completed: AtomicU64,
    queued: AtomicUsize,
}

/// State shared by all clones of a [`WorkerPool`].
struct PoolShared {
    conf: PoolConf,
    counters: Arc<Counters>,
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

/// Track a task as active for as long as the guard is alive.
///
/// Tasks can be aborted mid-execution so the count is released on drop.
struct ActiveGuard<'a>(&'a Counters);

impl<'a> ActiveGuard<'a> {
    fn enter(counters: &'a Counters) -> ActiveGuard<'a> {
        counters.active.fetch_add(1, Ordering::AcqRel);
        ACTIVE_TASKS.inc();
        ActiveGuard(counters)
    }
}

impl<'a> Drop for ActiveGuard<'a> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::AcqRel);
        ACTIVE_TASKS.dec();
    }
}

/// Single pull loop over the shared queue.
struct Worker {
    counters: Arc<Counters>,
    logger: Logger,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Task>>>,
    task_timeout: Duration,
}

impl Worker {
    /// Execute tasks until the queue is closed and empty.
    async fn run(self) {
        slog::debug!(self.logger, "Pool worker started");
        while let Some(task) = self.next().await {
            self.execute(task).await;
        }
        slog::debug!(self.logger, "Pool worker stopped");
    }

    /// Run a task to completion, catching errors, panics and timeouts.
    async fn execute(&self, task: Task) {
        let Task {
            logger,
            name,
            trace,
            work,
        } = task;
        let _active = ActiveGuard::enter(&self.counters);

        // Link the execution span to the trace of the submitting operation.
        let mut span = TRACER.span_builder("pool.task.execute");
        span.span_kind = Some(SpanKind::Internal);
        let span = TRACER.build_with_context(span, &trace);
        let otel_context = trace.with_span(span);

        let timeout = self.task_timeout;
        let work = async move {
            let work = AssertUnwindSafe(work).catch_unwind();
            match tokio::time::timeout(timeout, work).await {
                Err(_) => anyhow::bail!(TaskTimedOut {
                    task: name,
                    timeout
                }),
                Ok(Err(payload)) => anyhow::bail!(TaskPanicked {
                    message: panic_message(payload),
                    task: name,
                }),
                Ok(Ok(result)) => result,
            }
        };
        let result = work
            .trace_on_err_with_status()
            .with_context(otel_context)
            .await;

        let outcome = TaskOutcome::from(&result);
        EXECUTE_COUNT.with_label_values(&[outcome.as_str()]).inc();
        self.counters.completed.fetch_add(1, Ordering::AcqRel);
        match (outcome, result) {
            (_, Ok(())) => slog::trace!(logger, "Task completed"),
            (TaskOutcome::Failed, Err(error)) => slog::debug!(
                logger, "Task completed with an error";
                ErrorAttributes::from(&error),
            ),
            (outcome, Err(error)) => slog::error!(
                logger, "Task execution aborted";
                "outcome" => outcome.as_str(),
                ErrorAttributes::from(&error),
            ),
        }
    }

    /// Wait for the next task on the shared queue.
    async fn next(&self) -> Option<Task> {
        let task = self.receiver.lock().await.recv().await;
        if task.is_some() {
            self.counters.queued.fetch_sub(1, Ordering::AcqRel);
            QUEUE_DEPTH.dec();
        }
        task
    }
}

/// Extract a printable message from a panic payload.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(_) => String::from("<non-string panic payload>"),
    }
}
