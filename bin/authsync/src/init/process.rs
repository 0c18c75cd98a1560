//! Wire configuration, telemetry and the authorizer into a running process.
use anyhow::Result;

use replisdk::runtime::telemetry::Telemetry;

use authsync_authz::Authorizer;
use authsync_conf::AuthorizationConf;
use authsync_conf::Conf;
use authsync_context::Context;
use authsync_fga::FgaClient;
use authsync_fga_http::HttpFga;
use authsync_pool::WorkerPool;

/// Initialised authsync process components.
pub struct Process {
    /// Dispatch entitlement changes for resources managed by the process.
    pub authorizer: Authorizer,

    /// Loaded process configuration.
    pub conf: Conf,

    /// Root context for the process.
    pub context: Context,

    /// Process telemetry (logging, metrics and tracing).
    pub telemetry: Telemetry,
}

impl Process {
    /// Initialise telemetry and the authorizer from the loaded configuration.
    pub async fn configure(conf: Conf) -> Result<Process> {
        let telemetry = super::telemetry(conf.telemetry.clone()).await?;
        let context = Context::root(telemetry.logger.clone()).build();
        register_metrics(&telemetry.metrics)?;

        let authorizer = authorizer(&context, &conf.authorization)?;
        let process = Process {
            authorizer,
            conf,
            context,
            telemetry,
        };
        Ok(process)
    }

    /// Check the authorization store before changes are accepted.
    ///
    /// Errors are fatal: the process must not serve requests against an unexpected model.
    pub async fn validate(&self) -> Result<()> {
        self.authorizer.validate_model(&self.context).await
    }

    /// Initialisation done, wait until the user shuts the process down then drain the authorizer.
    pub async fn wait(self) -> Result<()> {
        slog::info!(
            self.context.logger, "authsync process initialisation complete";
            "authorization_enabled" => self.conf.authorization.enabled,
        );
        let shutdown = super::shutdown_manager(self.telemetry.logger.clone(), &self.conf).build();
        let result = shutdown.wait().await;
        self.authorizer.shutdown(&self.context).await?;
        result
    }
}

/// Create the [`Authorizer`] selected by the configuration.
///
/// When authorization is disabled entitlement changes are accepted and discarded.
pub fn authorizer(context: &Context, conf: &AuthorizationConf) -> Result<Authorizer> {
    if !conf.enabled {
        slog::warn!(context.logger, "Authorization is disabled, entitlement changes are discarded");
        let pool = WorkerPool::start(context, conf.pool.clone());
        return Authorizer::noop(pool);
    }

    let client = FgaClient::from(HttpFga::new(&conf.store)?);
    let pool = WorkerPool::start(context, conf.pool.clone());
    Authorizer::new(client, pool)
}

/// Register metrics for all process components.
fn register_metrics(registry: &prometheus::Registry) -> Result<()> {
    authsync_authz::register_metrics(registry)?;
    authsync_fga_http::register_metrics(registry)?;
    authsync_pool::register_metrics(registry)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use authsync_authz::AuthorizerState;
    use authsync_conf::AuthorizationConf;
    use authsync_context::Context;

    #[tokio::test]
    async fn disabled_authorization_discards_changes() {
        let context = Context::fixture();
        let conf = AuthorizationConf::default();
        let authorizer = super::authorizer(&context, &conf).unwrap();
        authorizer.validate_model(&context).await.unwrap();
        assert_eq!(authorizer.state(), AuthorizerState::Ready);
        authorizer
            .set_create_client_entitlements(&context, "c1")
            .await
            .unwrap();
        authorizer.shutdown(&context).await.unwrap();
    }

    #[tokio::test]
    async fn enabled_authorization_waits_for_validation() {
        let context = Context::fixture();
        let conf = AuthorizationConf {
            enabled: true,
            ..Default::default()
        };
        let authorizer = super::authorizer(&context, &conf).unwrap();
        assert_eq!(authorizer.state(), AuthorizerState::Constructed);
        authorizer.shutdown(&context).await.unwrap();
    }
}
