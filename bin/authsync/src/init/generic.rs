//! Process initialisation steps shared by all commands.
use anyhow::Result;

use replisdk::runtime::shutdown::ShutdownManager;
use replisdk::runtime::shutdown::ShutdownManagerBuilder;
use replisdk::runtime::telemetry;
use replisdk::runtime::telemetry::Telemetry;
use replisdk::runtime::telemetry::TelemetryConfig;
use replisdk::runtime::telemetry::TelemetryOptions;

use authsync_conf::Conf;

/// Initialise process shutdown manager.
pub fn shutdown_manager(logger: slog::Logger, conf: &Conf) -> ShutdownManagerBuilder<()> {
    let mut shutdown = ShutdownManager::builder();
    shutdown
        .logger(logger)
        .graceful_shutdown_timeout(conf.runtime.shutdown_grace())
        .watch_signal_with_default();
    shutdown
}

/// Initialise process telemetry.
pub async fn telemetry(conf: TelemetryConfig) -> Result<Telemetry> {
    let telemetry_options = TelemetryOptions::for_sentry_release(super::RELEASE_ID)
        .for_app(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .finish();
    let telemetry = telemetry::initialise(conf, telemetry_options).await?;
    slog::info!(telemetry.logger, "Process telemetry initialised");
    Ok(telemetry)
}
