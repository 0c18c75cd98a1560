//! Data objects storing the process configuration.
use serde::Deserialize;
use serde::Serialize;

use replisdk::runtime::telemetry::TelemetryConfig;

use authsync_fga_http::StoreConf;
use authsync_pool::PoolConf;

use super::RuntimeConf;

/// Global configuration for the authsync process.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conf {
    /// Authorization store synchronisation configuration.
    #[serde(default)]
    pub authorization: AuthorizationConf,

    /// Process runtime configuration.
    #[serde(default)]
    pub runtime: RuntimeConf,

    /// Telemetry configuration for the process.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Configure how entitlements are propagated to the authorization store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationConf {
    /// Propagate entitlements to the authorization store.
    ///
    /// When disabled entitlement changes are accepted and discarded.
    #[serde(default)]
    pub enabled: bool,

    /// Worker pool running entitlement changes in the background.
    #[serde(default, flatten)]
    pub pool: PoolConf,

    /// Location and credentials of the authorization store.
    #[serde(default)]
    pub store: StoreConf,
}

#[cfg(test)]
mod tests {
    use super::Conf;

    #[test]
    fn empty_document_uses_defaults() {
        let conf: Conf = serde_yaml::from_str("{}").unwrap();
        assert!(!conf.authorization.enabled);
        assert_eq!(conf.authorization.pool, Default::default());
        assert_eq!(conf.authorization.store.base_url(), "http://localhost:8080");
        assert!(conf.authorization.store.store_id.is_none());
    }

    #[test]
    fn pool_options_are_flattened() {
        let conf: Conf = serde_yaml::from_str(
            r#"
authorization:
  enabled: true
  workers: 2
  stop_grace_sec: 1
"#,
        )
        .unwrap();
        assert!(conf.authorization.enabled);
        assert_eq!(conf.authorization.pool.workers, 2);
        assert_eq!(conf.authorization.pool.stop_grace_sec, 1);
        assert_eq!(conf.authorization.pool.queue_capacity, 256);
    }
}
