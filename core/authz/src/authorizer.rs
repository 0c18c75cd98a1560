//! Dispatch entitlement changes to the authorization store in the background.
use std::sync::Arc;

use anyhow::Result;
use slog::Logger;

use replisdk::utils::error::slog::ErrorAttributes;

use authsync_context::Context;
use authsync_fga::AuthorizationModel;
use authsync_fga::FgaClient;
use authsync_pool::StopOutcome;
use authsync_pool::Task;
use authsync_pool::WorkerPool;

use crate::errors::InvalidState;
use crate::errors::ModelValidationFailed;
use crate::kind::Entitlement;
use crate::kind::Operation;
use crate::kind::ResourceKind;
use crate::state::AuthorizerState;
use crate::state::StateCell;
use crate::telemetry::APPLY_ERR;
use crate::telemetry::DISPATCH_COUNT;
use crate::telemetry::DISPATCH_ERR;

/// Keep the authorization store in sync with resources as they are created and deleted.
///
/// Resource services call the `set_*_entitlements` methods once their own change is stored.
/// These methods only queue the change onto the [`WorkerPool`] and return:
/// failures to apply the change to the store are logged and counted but never reported
/// to the caller, which has usually responded to its own client by then.
///
/// Changes to the same resource are not ordered: a delete submitted right after a create
/// may be applied first and leave the create grants behind.
///
/// The authorizer only accepts changes once [`Authorizer::validate_model`] confirmed
/// the store enforces the model embedded in the process.
#[derive(Clone)]
pub struct Authorizer(Arc<AuthorizerInner>);

struct AuthorizerInner {
    client: FgaClient,
    model: AuthorizationModel,
    pool: WorkerPool,
    state: StateCell,
}

impl Authorizer {
    /// Create an authorizer applying changes with the given client on the given pool.
    pub fn new(client: FgaClient, pool: WorkerPool) -> Result<Authorizer> {
        let model = crate::model::expected_model()?;
        let inner = AuthorizerInner {
            client,
            model,
            pool,
            state: StateCell::new(AuthorizerState::Constructed),
        };
        Ok(Authorizer(Arc::new(inner)))
    }

    /// Create an authorizer that accepts and discards all changes.
    ///
    /// Changes still go through the pool so callers observe the same behaviour
    /// whether authorization is enabled or not.
    pub fn noop(pool: WorkerPool) -> Result<Authorizer> {
        Authorizer::new(FgaClient::noop(), pool)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AuthorizerState {
        self.0.state.get()
    }

    /// Check the store enforces the expected model and start accepting changes.
    ///
    /// Failing validation is terminal: the process must not serve requests.
    pub async fn validate_model(&self, context: &Context) -> Result<()> {
        let state = &self.0.state;
        if let Err(current) = state.transition(
            &[AuthorizerState::Constructed],
            AuthorizerState::ValidatingModel,
        ) {
            anyhow::bail!(InvalidState {
                operation: "validate the authorization model",
                state: current,
            });
        }

        slog::debug!(context.logger, "Validating authorization model in the store");
        match self.0.client.validate_model(context, &self.0.model).await {
            Ok(()) => {
                state.set(AuthorizerState::Ready);
                slog::info!(context.logger, "Authorization model validated");
                Ok(())
            }
            Err(error) => {
                state.set(AuthorizerState::Failed);
                slog::error!(
                    context.logger, "Authorization model validation failed";
                    ErrorAttributes::from(&error),
                );
                Err(error.context(ModelValidationFailed))
            }
        }
    }

    /// Queue an entitlement change for background execution.
    ///
    /// Only errors queueing the change are returned.
    pub async fn dispatch(&self, context: &Context, entitlement: Entitlement) -> Result<()> {
        let kind = entitlement.kind.object_type();
        let operation = entitlement.operation.as_str();
        let state = self.state();
        if state != AuthorizerState::Ready {
            DISPATCH_ERR.with_label_values(&[kind, operation]).inc();
            anyhow::bail!(InvalidState {
                operation: "dispatch entitlement changes",
                state,
            });
        }

        // Tasks outlive the request that dispatched them so they get no deadline from it.
        let task_context = context
            .derive()
            .detached()
            .log_trace()
            .log_values(slog::o!(
                "resource_kind" => kind,
                "resource_id" => entitlement.resource_id.clone(),
                "operation" => operation,
            ))
            .build();
        let name = match entitlement.operation {
            Operation::Grant => "entitlements.grant",
            Operation::Revoke => "entitlements.revoke",
        };
        let work = apply(self.0.client.clone(), task_context.clone(), entitlement);
        let task = Task::new(&task_context, name, work);

        DISPATCH_COUNT.with_label_values(&[kind, operation]).inc();
        if let Err(error) = self.0.pool.submit(context, task).await {
            DISPATCH_ERR.with_label_values(&[kind, operation]).inc();
            return Err(error);
        }
        Ok(())
    }

    /// Grant ownership of a newly created resource.
    pub async fn set_create_entitlements(
        &self,
        context: &Context,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Result<()> {
        self.dispatch(context, Entitlement::grant(kind, resource_id))
            .await
    }

    /// Revoke every relation on a deleted resource.
    pub async fn set_delete_entitlements(
        &self,
        context: &Context,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Result<()> {
        self.dispatch(context, Entitlement::revoke(kind, resource_id))
            .await
    }

    /// Stop accepting changes and wait for queued ones to be applied.
    ///
    /// Calling this method more than once has no effect.
    pub async fn shutdown(&self, context: &Context) -> Result<StopOutcome> {
        let state = &self.0.state;
        let transition = state.transition(
            &[
                AuthorizerState::Constructed,
                AuthorizerState::ValidatingModel,
                AuthorizerState::Ready,
            ],
            AuthorizerState::Draining,
        );
        let drain = match transition {
            Ok(_) => true,
            Err(AuthorizerState::Failed) => false,
            Err(_) => return Ok(StopOutcome::AlreadyStopped),
        };

        let outcome = self.0.pool.stop(context).await;
        if drain {
            state.set(AuthorizerState::Stopped);
        }
        slog::info!(
            context.logger, "Authorizer stopped";
            "outcome" => format!("{:?}", outcome),
        );
        Ok(outcome)
    }
}

/// Per resource kind shortcuts to entitlement changes.
impl Authorizer {
    pub async fn set_create_client_entitlements(&self, context: &Context, id: &str) -> Result<()> {
        self.set_create_entitlements(context, ResourceKind::Client, id)
            .await
    }

    pub async fn set_delete_client_entitlements(&self, context: &Context, id: &str) -> Result<()> {
        self.set_delete_entitlements(context, ResourceKind::Client, id)
            .await
    }

    pub async fn set_create_identity_provider_entitlements(
        &self,
        context: &Context,
        id: &str,
    ) -> Result<()> {
        self.set_create_entitlements(context, ResourceKind::IdentityProvider, id)
            .await
    }

    pub async fn set_delete_identity_provider_entitlements(
        &self,
        context: &Context,
        id: &str,
    ) -> Result<()> {
        self.set_delete_entitlements(context, ResourceKind::IdentityProvider, id)
            .await
    }

    pub async fn set_create_rule_entitlements(&self, context: &Context, id: &str) -> Result<()> {
        self.set_create_entitlements(context, ResourceKind::Rule, id)
            .await
    }

    pub async fn set_delete_rule_entitlements(&self, context: &Context, id: &str) -> Result<()> {
        self.set_delete_entitlements(context, ResourceKind::Rule, id)
            .await
    }

    pub async fn set_create_schema_entitlements(&self, context: &Context, id: &str) -> Result<()> {
        self.set_create_entitlements(context, ResourceKind::Schema, id)
            .await
    }

    pub async fn set_delete_schema_entitlements(&self, context: &Context, id: &str) -> Result<()> {
        self.set_delete_entitlements(context, ResourceKind::Schema, id)
            .await
    }
}

/// Apply an entitlement change to the store, logging failures with the resource details.
async fn apply(client: FgaClient, context: Context, entitlement: Entitlement) -> Result<()> {
    let kind = entitlement.kind;
    let id = &entitlement.resource_id;
    let result = match entitlement.operation {
        Operation::Grant => {
            let tuples = kind.grants(id, &entitlement.actor);
            client.write_tuples(&context, tuples).await
        }
        Operation::Revoke => revoke(&client, &context, kind, id).await,
    };

    match result {
        Ok(()) => slog::debug!(context.logger, "Entitlement change applied"),
        Err(ref error) => {
            let operation = entitlement.operation.as_str();
            APPLY_ERR
                .with_label_values(&[kind.object_type(), operation])
                .inc();
            log_failure(&context.logger, error);
        }
    }
    result
}

/// Delete every tuple about a resource.
async fn revoke(client: &FgaClient, context: &Context, kind: ResourceKind, id: &str) -> Result<()> {
    let filter = kind.revocations(id);
    let tuples = client.read_all_tuples(context, &filter).await?;
    if tuples.is_empty() {
        slog::debug!(context.logger, "No entitlements to revoke");
        return Ok(());
    }
    slog::trace!(context.logger, "Revoking entitlements"; "tuples" => tuples.len());
    client.delete_tuples(context, tuples).await
}

fn log_failure(logger: &Logger, error: &anyhow::Error) {
    slog::error!(
        logger, "Unable to apply entitlement change to the authorization store";
        ErrorAttributes::from(error),
    );
}
