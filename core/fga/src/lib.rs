//! Client interface to relationship-based authorization stores.
//!
//! Authorization stores hold two kinds of data:
//!
//! - An [`AuthorizationModel`] describing object types and the relations between them.
//! - Relationship [`Tuple`]s granting relations on objects to users.
//!
//! The [`FgaClient`] type exposes the operations the process needs on the store
//! and delegates them to an [`FgaBackend`] selected at runtime.
use std::sync::Arc;

use anyhow::Result;

use authsync_context::Context;

pub mod errors;
pub mod models;

mod noop;
mod validate;

#[cfg(any(test, feature = "test-fixture"))]
mod fixture;
#[cfg(any(test, feature = "test-fixture"))]
pub use self::fixture::FgaFixture;
#[cfg(any(test, feature = "test-fixture"))]
pub use self::fixture::FgaFixtureFailure;
#[cfg(any(test, feature = "test-fixture"))]
pub use self::fixture::FgaFixtureRequests;
#[cfg(any(test, feature = "test-fixture"))]
pub use self::fixture::FIXTURE_PAGE_SIZE;


pub use self::models::AuthorizationModel;
pub use self::models::Tuple;
pub use self::models::TupleFilter;
pub use self::models::TuplePage;
pub use self::noop::NoopFga;
pub use self::validate::compare as compare_models;

/// Maximum number of tuples included in a single write or delete request.
pub const MAX_TUPLES_PER_WRITE: usize = 100;

/// Access a relationship-based authorization store.
///
/// Tuples are validated before they are sent to the backend and large writes
/// and deletes are split into requests of at most [`MAX_TUPLES_PER_WRITE`] tuples.
#[derive(Clone)]
pub struct FgaClient(Arc<dyn FgaBackend>);

impl FgaClient {
    /// Create a new authorization store and select it for future operations.
    pub async fn create_store(&self, context: &Context, name: &str) -> Result<String> {
        self.0.create_store(context, name).await
    }

    /// Remove relationship tuples from the store.
    ///
    /// Requests are processed in order and the first failure aborts the operation.
    /// Chunks deleted before the failure are not restored.
    pub async fn delete_tuples(&self, context: &Context, tuples: Vec<Tuple>) -> Result<()> {
        for tuple in &tuples {
            tuple.validate()?;
        }
        for chunk in tuples.chunks(MAX_TUPLES_PER_WRITE) {
            self.0.delete_tuples(context, chunk.to_vec()).await?;
        }
        Ok(())
    }

    /// Fetch the configured authorization model from the store.
    ///
    /// Backends without a configured model ID return the latest model in the store.
    pub async fn read_model(&self, context: &Context) -> Result<AuthorizationModel> {
        self.0.read_model(context).await
    }

    /// Read one page of tuples matching the filter.
    ///
    /// Pass the continuation token from the previous page to fetch the next one.
    pub async fn read_tuples(
        &self,
        context: &Context,
        filter: &TupleFilter,
        continuation: Option<String>,
    ) -> Result<TuplePage> {
        self.0.read_tuples(context, filter, continuation).await
    }

    /// Read all tuples matching the filter, following continuation tokens.
    pub async fn read_all_tuples(
        &self,
        context: &Context,
        filter: &TupleFilter,
    ) -> Result<Vec<Tuple>> {
        let mut tuples = Vec::new();
        let mut continuation = None;
        loop {
            let page = self.0.read_tuples(context, filter, continuation).await?;
            tuples.extend(page.tuples);
            continuation = match page.continuation_token {
                Some(token) if !token.is_empty() => Some(token),
                _ => break,
            };
        }
        Ok(tuples)
    }

    /// Select the authorization store to use for future operations.
    pub fn set_store_id(&self, context: &Context, id: &str) {
        slog::debug!(context.logger, "Selecting authorization store"; "store_id" => id);
        self.0.set_store_id(id)
    }

    /// Check the configured model in the store matches the expected model.
    pub async fn validate_model(
        &self,
        context: &Context,
        expected: &AuthorizationModel,
    ) -> Result<()> {
        self.0.validate_model(context, expected).await
    }

    /// Write a new authorization model to the store and return its ID.
    pub async fn write_model(&self, context: &Context, model: &AuthorizationModel) -> Result<String> {
        let model = model.without_id();
        self.0.write_model(context, &model).await
    }

    /// Add relationship tuples to the store.
    ///
    /// Requests are processed in order and the first failure aborts the operation.
    /// Chunks written before the failure are not rolled back.
    pub async fn write_tuples(&self, context: &Context, tuples: Vec<Tuple>) -> Result<()> {
        for tuple in &tuples {
            tuple.validate()?;
        }
        for chunk in tuples.chunks(MAX_TUPLES_PER_WRITE) {
            self.0.write_tuples(context, chunk.to_vec()).await?;
        }
        Ok(())
    }
}

impl FgaClient {
    /// Client that accepts every operation and does nothing.
    pub fn noop() -> FgaClient {
        FgaClient::from(NoopFga)
    }
}

impl<T> From<T> for FgaClient
where
    T: FgaBackend + 'static,
{
    fn from(value: T) -> Self {
        FgaClient(Arc::new(value))
    }
}

#[cfg(any(test, feature = "test-fixture"))]
impl FgaClient {
    /// Initialise a client backed by an in-memory store for unit tests.
    pub fn fixture() -> (FgaClient, FgaFixture) {
        let fixture = FgaFixture::default();
        let client = FgaClient::from(fixture.clone());
        (client, fixture)
    }
}

/// Operations implemented by relationship-based authorization store clients.
///
/// Backends report failures with errors from the [`errors`] module attached
/// so callers can classify them.
#[async_trait::async_trait]
pub trait FgaBackend: Send + Sync {
    /// Create a new store and select it for future operations.
    async fn create_store(&self, context: &Context, name: &str) -> Result<String>;

    /// Delete the given tuples in a single request.
    async fn delete_tuples(&self, context: &Context, tuples: Vec<Tuple>) -> Result<()>;

    /// Fetch the configured authorization model, or the latest one if none is configured.
    async fn read_model(&self, context: &Context) -> Result<AuthorizationModel>;

    /// Read one page of tuples matching a filter.
    async fn read_tuples(
        &self,
        context: &Context,
        filter: &TupleFilter,
        continuation: Option<String>,
    ) -> Result<TuplePage>;

    /// Select the store to use for future operations.
    fn set_store_id(&self, id: &str);

    /// Check the configured model matches the expected model.
    async fn validate_model(&self, context: &Context, expected: &AuthorizationModel) -> Result<()> {
        let actual = self.read_model(context).await?;
        validate::compare(expected, &actual)
    }

    /// Write an authorization model and return the ID assigned to it.
    async fn write_model(&self, context: &Context, model: &AuthorizationModel) -> Result<String>;

    /// Write the given tuples in a single request.
    async fn write_tuples(&self, context: &Context, tuples: Vec<Tuple>) -> Result<()>;
}
