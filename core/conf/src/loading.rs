//! Load configuration from files.
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;

use crate::Conf;

/// Errors loading the process configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unable to decode configuration from file at the given path.
    #[error("unable to decode configuration from file at '{0}'")]
    // (path,)
    Decode(String),

    /// Unable to read configuration file at the given path.
    #[error("unable to read configuration file at '{0}'")]
    // (path,)
    Open(String),

    /// Configuration file not found at the given path.
    #[error("configuration file not found at '{0}'")]
    // (path,)
    PathNotFound(String),
}

/// Load process configuration from the YAML file at the specified path.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Conf> {
    let path = path.as_ref();
    let display = path.display().to_string();
    if !path.exists() {
        anyhow::bail!(Error::PathNotFound(display));
    }

    let file = File::open(path).with_context(|| Error::Open(display.clone()))?;
    let conf = serde_yaml::from_reader(file).with_context(|| Error::Decode(display))?;
    Ok(conf)
}

#[cfg(test)]
mod tests {
    use super::load;
    use super::Error;

    const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/authsync.yaml");

    #[test]
    fn load_fixture() {
        let conf = load(FIXTURE).unwrap();
        let authorization = conf.authorization;
        assert!(authorization.enabled);
        assert_eq!(authorization.pool.workers, 4);
        assert_eq!(authorization.pool.queue_capacity, 64);
        assert_eq!(authorization.pool.submit_timeout_ms, 250);
        assert_eq!(authorization.pool.task_timeout_sec, 15);
        assert_eq!(authorization.pool.stop_grace_sec, 3);
        assert_eq!(authorization.store.base_url(), "https://fga.internal:8443");
        assert_eq!(authorization.store.api_token.as_deref(), Some("s3cr3t"));
        assert_eq!(authorization.store.store_id.as_deref(), Some("01HSTORE"));
        assert_eq!(authorization.store.model_id.as_deref(), Some("01HMODEL"));
        assert_eq!(authorization.store.timeout_sec, 5);
        assert_eq!(conf.runtime.shutdown_grace_sec, 20);
    }

    #[test]
    fn missing_file() {
        let error = load("/this/path/does/not/exist.yaml").unwrap_err();
        match error.downcast_ref::<Error>() {
            Some(Error::PathNotFound(path)) => assert_eq!(path, "/this/path/does/not/exist.yaml"),
            _ => panic!("unexpected error {:?}", error),
        }
    }

    #[test]
    fn invalid_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        let error = load(path).unwrap_err();
        assert!(matches!(error.downcast_ref::<Error>(), Some(Error::Decode(_))));
    }
}
