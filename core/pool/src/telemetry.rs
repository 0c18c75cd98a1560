//! Telemetry related to task submission and execution.
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use anyhow::Result;
use once_cell::sync::Lazy;
use opentelemetry_api::global::BoxedTracer;
use opentelemetry_api::trace::TracerProvider;
use prometheus::Counter;
use prometheus::CounterVec;
use prometheus::IntGauge;
use prometheus::Opts;

/// Number of tasks currently executing on pool workers.
pub static ACTIVE_TASKS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "authsync_pool_active_tasks",
        "Number of tasks currently executing on pool workers",
    )
    .expect("failed to initialise ACTIVE_TASKS gauge")
});

/// Number of tasks executed, by outcome.
pub static EXECUTE_COUNT: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            "authsync_pool_execute_count",
            "Number of tasks executed, by outcome",
        ),
        &["outcome"],
    )
    .expect("failed to initialise EXECUTE_COUNT counter")
});

/// Number of tasks waiting for a worker.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "authsync_pool_queue_depth",
        "Number of tasks waiting for a worker",
    )
    .expect("failed to initialise QUEUE_DEPTH gauge")
});

/// Number of tasks abandoned because the pool stop grace period expired.
pub static STOP_ABANDONED: Lazy<Counter> = Lazy::new(|| {
    Counter::new(
        "authsync_pool_stop_abandoned",
        "Number of tasks abandoned because the pool stop grace period expired",
    )
    .expect("failed to initialise STOP_ABANDONED counter")
});

/// Total number of task submissions.
pub static SUBMIT_COUNT: Lazy<Counter> = Lazy::new(|| {
    Counter::new(
        "authsync_pool_submit_count",
        "Total number of task submissions",
    )
    .expect("failed to initialise SUBMIT_COUNT counter")
});

/// Number of task submissions that resulted in error.
pub static SUBMIT_ERR: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            "authsync_pool_submit_error",
            "Number of task submissions that resulted in error",
        ),
        &["reason"],
    )
    .expect("failed to initialise SUBMIT_ERR counter")
});

/// Open Telemetry tracer for task operations.
pub static TRACER: Lazy<BoxedTracer> = Lazy::new(|| {
    opentelemetry_api::global::tracer_provider().versioned_tracer(
        env!("CARGO_PKG_NAME"),
        Some(env!("CARGO_PKG_VERSION")),
        Option::<&str>::None,
        None,
    )
});

/// Ensure metrics are registered only once.
static METRICS_REGISTERED: AtomicBool = AtomicBool::new(false);

/// The first time this method is called it will register the worker pool metrics.
pub fn register_metrics(reg: &prometheus::Registry) -> Result<()> {
    // Skip registration if already done before.
    if METRICS_REGISTERED.swap(true, Ordering::AcqRel) {
        return Ok(());
    }

    let collectors: [Box<dyn prometheus::core::Collector>; 6] = [
        Box::new(ACTIVE_TASKS.clone()),
        Box::new(EXECUTE_COUNT.clone()),
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(STOP_ABANDONED.clone()),
        Box::new(SUBMIT_COUNT.clone()),
        Box::new(SUBMIT_ERR.clone()),
    ];
    for collector in collectors {
        reg.register(collector)?;
    }
    Ok(())
}
