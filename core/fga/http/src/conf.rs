//! Configuration of the HTTP authorization store client.
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Location and credentials of the authorization store API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConf {
    /// Host (and optional port) of the store API server.
    #[serde(default = "StoreConf::default_api_host")]
    pub api_host: String,

    /// Scheme (`http` or `https`) to reach the API server with.
    #[serde(default = "StoreConf::default_api_scheme")]
    pub api_scheme: String,

    /// Pre-shared key sent as a bearer token with every request.
    #[serde(default)]
    pub api_token: Option<String>,

    /// ID of the authorization model to validate and write tuples against.
    ///
    /// When not set the latest model in the store is used.
    #[serde(default)]
    pub model_id: Option<String>,

    /// ID of the store to operate on.
    #[serde(default)]
    pub store_id: Option<String>,

    /// Timeout, in seconds, for requests to the store.
    #[serde(default = "StoreConf::default_timeout_sec")]
    pub timeout_sec: u64,
}

impl Default for StoreConf {
    fn default() -> Self {
        StoreConf {
            api_host: StoreConf::default_api_host(),
            api_scheme: StoreConf::default_api_scheme(),
            api_token: None,
            model_id: None,
            store_id: None,
            timeout_sec: StoreConf::default_timeout_sec(),
        }
    }
}

impl StoreConf {
    /// Base URL of the store API, without a trailing slash.
    pub fn base_url(&self) -> String {
        let host = self.api_host.trim_end_matches('/');
        format!("{}://{}", self.api_scheme, host)
    }

    /// Timeout for requests to the store.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    fn default_api_host() -> String {
        String::from("localhost:8080")
    }

    fn default_api_scheme() -> String {
        String::from("http")
    }

    fn default_timeout_sec() -> u64 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::StoreConf;

    #[test]
    fn base_url() {
        let conf = StoreConf {
            api_host: "fga.example.com:8443/".into(),
            api_scheme: "https".into(),
            ..Default::default()
        };
        assert_eq!(conf.base_url(), "https://fga.example.com:8443");
    }

    #[test]
    fn defaults_from_empty_object() {
        let conf: StoreConf = serde_json::from_str("{}").unwrap();
        assert_eq!(conf, StoreConf::default());
        assert_eq!(conf.base_url(), "http://localhost:8080");
        assert_eq!(conf.timeout().as_secs(), 10);
    }
}
