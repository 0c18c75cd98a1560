//! Initialisation logic for authsync processes.
mod generic;
mod process;

pub use self::generic::shutdown_manager;
pub use self::generic::telemetry;
pub use self::process::Process;

/// ID of the authsync release in sentry recommanded format.
const RELEASE_ID: &str = concat!(env!("CARGO_PKG_NAME"), "@", env!("CARGO_PKG_VERSION"));
