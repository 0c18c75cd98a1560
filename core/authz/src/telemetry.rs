//! Telemetry related to entitlement changes.
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::CounterVec;
use prometheus::Opts;

/// Number of entitlement changes submitted for background execution.
pub static DISPATCH_COUNT: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            "authsync_authz_dispatch_count",
            "Number of entitlement changes submitted for background execution",
        ),
        &["kind", "operation"],
    )
    .expect("failed to initialise DISPATCH_COUNT counter")
});

/// Number of entitlement changes that could not be submitted.
pub static DISPATCH_ERR: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            "authsync_authz_dispatch_error",
            "Number of entitlement changes that could not be submitted",
        ),
        &["kind", "operation"],
    )
    .expect("failed to initialise DISPATCH_ERR counter")
});

/// Number of entitlement changes that failed to apply to the store.
pub static APPLY_ERR: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            "authsync_authz_apply_error",
            "Number of entitlement changes that failed to apply to the store",
        ),
        &["kind", "operation"],
    )
    .expect("failed to initialise APPLY_ERR counter")
});

/// Ensure metrics are registered only once.
static METRICS_REGISTERED: AtomicBool = AtomicBool::new(false);

/// The first time this method is called it will register the authorizer metrics.
pub fn register_metrics(reg: &prometheus::Registry) -> Result<()> {
    // Skip registration if already done before.
    if METRICS_REGISTERED.swap(true, Ordering::AcqRel) {
        return Ok(());
    }

    let collectors: [Box<dyn prometheus::core::Collector>; 3] = [
        Box::new(APPLY_ERR.clone()),
        Box::new(DISPATCH_COUNT.clone()),
        Box::new(DISPATCH_ERR.clone()),
    ];
    for collector in collectors {
        reg.register(collector)?;
    }
    Ok(())
}
