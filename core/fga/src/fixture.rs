//! In-memory implementation of [`FgaBackend`] for unit tests.
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;

use authsync_context::Context;

use crate::errors::InvalidModel;
use crate::errors::InvalidTuple;
use crate::errors::ModelUnavailable;
use crate::errors::StoreNotSelected;
use crate::errors::StoreUnavailable;
use crate::errors::Unauthorized;
use crate::models::AuthorizationModel;
use crate::models::Tuple;
use crate::models::TupleFilter;
use crate::models::TuplePage;
use crate::FgaBackend;

/// Number of tuples returned in each page by [`FgaFixture`] reads.
pub const FIXTURE_PAGE_SIZE: usize = 50;

/// Failures the [`FgaFixture`] can be instructed to return for every request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FgaFixtureFailure {
    /// Requests fail with [`StoreUnavailable`] errors.
    StoreUnavailable,

    /// Requests fail with [`Unauthorized`] errors.
    Unauthorized,
}

/// Number of requests processed by an [`FgaFixture`], by request type.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FgaFixtureRequests {
    pub deletes: usize,
    pub reads: usize,
    pub writes: usize,
}

/// In-memory authorization store for unit tests.
///
/// Clones of the fixture share state so tests can inspect the store
/// after handing a copy to the code under test.
#[derive(Clone)]
pub struct FgaFixture {
    inner: Arc<Mutex<FgaFixtureState>>,
}

impl FgaFixture {
    /// Make every following request fail, or succeed again with `None`.
    pub fn fail(&self, failure: Option<FgaFixtureFailure>) {
        self.access().failure = failure;
    }

    /// Add tuples to the store without going through the client.
    pub fn insert_tuples<I>(&self, tuples: I)
    where
        I: IntoIterator<Item = Tuple>,
    {
        self.access().tuples.extend(tuples);
    }

    /// Request counters.
    pub fn requests(&self) -> FgaFixtureRequests {
        self.access().requests
    }

    /// Delay every request by the given amount of time.
    pub fn set_delay(&self, delay: Duration) {
        self.access().delay = Some(delay);
    }

    /// Store a model and configure it as the model to read.
    pub fn set_model(&self, model: AuthorizationModel) -> String {
        let mut state = self.access();
        let id = state.next_id("model");
        let mut model = model;
        model.id = Some(id.clone());
        state.models.push(model);
        state.model_id = Some(id.clone());
        id
    }

    /// Currently selected store ID.
    pub fn store_id(&self) -> Option<String> {
        self.access().store_id.clone()
    }

    /// Snapshot of all tuples in the store, sorted.
    pub fn tuples(&self) -> Vec<Tuple> {
        self.access().tuples.iter().cloned().collect()
    }

    /// Wait until the stored tuples satisfy the predicate or the timeout expires.
    ///
    /// Returns `true` if the predicate was satisfied.
    pub async fn wait_for<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&BTreeSet<Tuple>) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if predicate(&self.access().tuples) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl FgaFixture {
    /// Lock and access the shared state.
    fn access(&self) -> MutexGuard<FgaFixtureState> {
        self.inner
            .lock()
            .expect("FgaFixture::inner state lock poisoned")
    }

    /// Apply the configured delay and failure to a request.
    async fn before_request(&self) -> Result<()> {
        let delay = self.access().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.access().failure {
            None => Ok(()),
            Some(FgaFixtureFailure::StoreUnavailable) => anyhow::bail!(StoreUnavailable),
            Some(FgaFixtureFailure::Unauthorized) => anyhow::bail!(Unauthorized),
        }
    }
}

impl Default for FgaFixture {
    fn default() -> Self {
        let state = FgaFixtureState {
            store_id: Some(String::from("fixture-store")),
            ..Default::default()
        };
        FgaFixture {
            inner: Arc::new(Mutex::new(state)),
        }
    }
}

#[async_trait::async_trait]
impl FgaBackend for FgaFixture {
    async fn create_store(&self, _: &Context, _: &str) -> Result<String> {
        self.before_request().await?;
        let mut state = self.access();
        let id = state.next_id("store");
        state.store_id = Some(id.clone());
        Ok(id)
    }

    async fn delete_tuples(&self, _: &Context, tuples: Vec<Tuple>) -> Result<()> {
        self.before_request().await?;
        let mut state = self.access();
        state.ensure_store()?;
        state.requests.deletes += 1;
        if let Some(missing) = tuples.iter().find(|tuple| !state.tuples.contains(*tuple)) {
            anyhow::bail!(InvalidTuple(missing.to_string()));
        }
        for tuple in &tuples {
            state.tuples.remove(tuple);
        }
        Ok(())
    }

    async fn read_model(&self, _: &Context) -> Result<AuthorizationModel> {
        self.before_request().await?;
        let state = self.access();
        state.ensure_store()?;
        let model = match &state.model_id {
            Some(id) => state
                .models
                .iter()
                .find(|model| model.id.as_deref() == Some(id.as_str())),
            None => state.models.last(),
        };
        match model {
            Some(model) => Ok(model.clone()),
            None => anyhow::bail!(ModelUnavailable),
        }
    }

    async fn read_tuples(
        &self,
        _: &Context,
        filter: &TupleFilter,
        continuation: Option<String>,
    ) -> Result<TuplePage> {
        self.before_request().await?;
        let mut state = self.access();
        state.ensure_store()?;
        state.requests.reads += 1;
        let offset = match continuation {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!(InvalidTuple(format!("bad token {}", token))))?,
        };
        let matching: Vec<Tuple> = state
            .tuples
            .iter()
            .filter(|tuple| filter.matches(tuple))
            .cloned()
            .collect();
        let end = (offset + FIXTURE_PAGE_SIZE).min(matching.len());
        let tuples = matching
            .get(offset..end)
            .map(|page| page.to_vec())
            .unwrap_or_default();
        let continuation_token = if end < matching.len() {
            Some(end.to_string())
        } else {
            None
        };
        Ok(TuplePage {
            continuation_token,
            tuples,
        })
    }

    fn set_store_id(&self, id: &str) {
        self.access().store_id = Some(id.to_string());
    }

    async fn write_model(&self, _: &Context, model: &AuthorizationModel) -> Result<String> {
        self.before_request().await?;
        if model.schema_version.is_empty() {
            anyhow::bail!(InvalidModel);
        }
        let mut state = self.access();
        state.ensure_store()?;
        let id = state.next_id("model");
        let mut model = model.clone();
        model.id = Some(id.clone());
        state.models.push(model);
        Ok(id)
    }

    async fn write_tuples(&self, _: &Context, tuples: Vec<Tuple>) -> Result<()> {
        self.before_request().await?;
        let mut state = self.access();
        state.ensure_store()?;
        state.requests.writes += 1;
        if let Some(existing) = tuples.iter().find(|tuple| state.tuples.contains(*tuple)) {
            anyhow::bail!(InvalidTuple(existing.to_string()));
        }
        state.tuples.extend(tuples);
        Ok(())
    }
}

/// Container for the shared fixture state.
#[derive(Default)]
struct FgaFixtureState {
    delay: Option<Duration>,
    failure: Option<FgaFixtureFailure>,
    ids: usize,
    model_id: Option<String>,
    models: Vec<AuthorizationModel>,
    requests: FgaFixtureRequests,
    store_id: Option<String>,
    tuples: BTreeSet<Tuple>,
}

impl FgaFixtureState {
    fn ensure_store(&self) -> Result<()> {
        if self.store_id.is_none() {
            anyhow::bail!(StoreNotSelected);
        }
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.ids += 1;
        format!("{}-{}", prefix, self.ids)
    }
}
