//! Async runtime and shutdown options for the authsync process.
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use replisdk::runtime::shutdown::DEFAULT_SHUTDOWN_GRACE_TIMEOUT;
use replisdk::runtime::tokio_conf::TokioRuntimeConf;

/// Options for the tokio runtime that hosts the worker pool and for draining it on exit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConf {
    /// Seconds the shutdown manager waits for the process to stop after a signal.
    ///
    /// Keep this above `authorization.stop_grace_sec` so queued entitlement changes can drain.
    #[serde(default = "RuntimeConf::default_shutdown_grace")]
    pub shutdown_grace_sec: u64,

    /// Worker threads and other settings of the tokio runtime.
    #[serde(default, flatten)]
    pub tokio: TokioRuntimeConf,
}

impl RuntimeConf {
    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_sec)
    }

    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_TIMEOUT
    }
}

impl Default for RuntimeConf {
    fn default() -> Self {
        RuntimeConf {
            shutdown_grace_sec: Self::default_shutdown_grace(),
            tokio: Default::default(),
        }
    }
}
