//! Authorization store client used when authorization is disabled.
use anyhow::Result;

use authsync_context::Context;

use crate::errors::ModelUnavailable;
use crate::models::AuthorizationModel;
use crate::models::Tuple;
use crate::models::TupleFilter;
use crate::models::TuplePage;
use crate::FgaBackend;

/// ID returned for stores and models "created" by the [`NoopFga`] backend.
const NOOP_ID: &str = "noop";

/// [`FgaBackend`] that accepts all operations without doing anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopFga;

#[async_trait::async_trait]
impl FgaBackend for NoopFga {
    async fn create_store(&self, _: &Context, _: &str) -> Result<String> {
        Ok(NOOP_ID.to_string())
    }

    async fn delete_tuples(&self, _: &Context, _: Vec<Tuple>) -> Result<()> {
        Ok(())
    }

    async fn read_model(&self, _: &Context) -> Result<AuthorizationModel> {
        anyhow::bail!(ModelUnavailable)
    }

    async fn read_tuples(
        &self,
        _: &Context,
        _: &TupleFilter,
        _: Option<String>,
    ) -> Result<TuplePage> {
        Ok(TuplePage::default())
    }

    fn set_store_id(&self, _: &str) {}

    async fn validate_model(&self, _: &Context, _: &AuthorizationModel) -> Result<()> {
        Ok(())
    }

    async fn write_model(&self, _: &Context, _: &AuthorizationModel) -> Result<String> {
        Ok(NOOP_ID.to_string())
    }

    async fn write_tuples(&self, _: &Context, _: Vec<Tuple>) -> Result<()> {
        Ok(())
    }
}
