//! Authorization store client for the HTTP(S) JSON API.
use std::sync::RwLock;

use anyhow::Result;
use opentelemetry_api::trace::FutureExt;
use reqwest::Client as ReqwestClient;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use replisdk::utils::metrics::CountFutureErrExt;
use replisdk::utils::trace::TraceFutureErrExt;

use authsync_context::Context;
use authsync_fga::errors::InvalidModel;
use authsync_fga::errors::InvalidTuple;
use authsync_fga::errors::ModelUnavailable;
use authsync_fga::errors::StoreNotSelected;
use authsync_fga::AuthorizationModel;
use authsync_fga::FgaBackend;
use authsync_fga::Tuple;
use authsync_fga::TupleFilter;
use authsync_fga::TuplePage;

mod api;
mod conf;
mod telemetry;

pub mod error;

#[cfg(test)]
mod tests;

pub use self::conf::StoreConf;
pub use self::telemetry::register_metrics;

use self::error::BadRequest;
use self::error::ResourceNotFound;

/// Number of tuples to request with each read.
const READ_PAGE_SIZE: usize = 100;

/// String to set as the user agent in HTTP request.
static CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Authorization store client for the HTTP(S) JSON API.
pub struct HttpFga {
    /// Base URL of the API server to send requests to.
    base: String,

    /// Low-level [`Client`](reqwest::Client) to perform HTTP requests with.
    client: ReqwestClient,

    /// Authorization model to operate against, if configured.
    model_id: Option<String>,

    /// Store to operate on, once selected.
    store_id: RwLock<Option<String>>,

    /// Bearer token to authenticate requests with.
    token: Option<String>,
}

impl HttpFga {
    /// Initialise a client from the store configuration.
    pub fn new(conf: &StoreConf) -> Result<HttpFga> {
        let client = ReqwestClient::builder()
            .connect_timeout(conf.timeout())
            .timeout(conf.timeout())
            .user_agent(CLIENT_USER_AGENT)
            .build()?;
        let client = HttpFga {
            base: conf.base_url(),
            client,
            model_id: conf.model_id.clone(),
            store_id: RwLock::new(conf.store_id.clone()),
            token: conf.api_token.clone(),
        };
        Ok(client)
    }

    /// Attach authentication to a request.
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            None => request,
            Some(token) => request.bearer_auth(token),
        }
    }

    /// Send a request, decode the response and record telemetry about it.
    async fn send<T>(&self, op: &'static str, request: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = self.authenticate(request);
        let (err_count, _timer) = crate::telemetry::observe_op(op);
        let trace = crate::telemetry::trace_op(op);
        async move {
            let response = request.send().await.map_err(crate::error::transport)?;
            crate::error::inspect(response).await
        }
        .count_on_err(err_count)
        .trace_on_err_with_status()
        .with_context(trace)
        .await
    }

    /// URL of the currently selected store.
    fn store_url(&self) -> Result<String> {
        let store_id = self
            .store_id
            .read()
            .expect("HttpFga::store_id lock poisoned")
            .clone();
        match store_id {
            None => anyhow::bail!(StoreNotSelected),
            Some(id) => Ok(format!("{}/stores/{}", self.base, id)),
        }
    }

    /// Send a tuple write or delete request.
    async fn write(&self, op: &'static str, request: api::WriteRequest) -> Result<()> {
        let url = format!("{}/write", self.store_url()?);
        let request = self.client.post(url).json(&request);
        self.send::<api::Empty>(op, request)
            .await
            .map_err(|error| match error.downcast_ref::<BadRequest>() {
                Some(bad) => {
                    let detail = bad.response.clone();
                    error.context(InvalidTuple(detail))
                }
                None => error,
            })?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl FgaBackend for HttpFga {
    async fn create_store(&self, context: &Context, name: &str) -> Result<String> {
        let url = format!("{}/stores", self.base);
        let request = self
            .client
            .post(url)
            .json(&api::CreateStoreRequest { name });
        let response: api::CreateStoreResponse = self.send("store.create", request).await?;
        self.set_store_id(&response.id);
        slog::info!(context.logger, "Created authorization store"; "store_id" => &response.id);
        Ok(response.id)
    }

    async fn delete_tuples(&self, _: &Context, tuples: Vec<Tuple>) -> Result<()> {
        let request = api::WriteRequest {
            authorization_model_id: self.model_id.clone(),
            deletes: Some(api::TupleKeys { tuple_keys: tuples }),
            ..Default::default()
        };
        self.write("tuples.delete", request).await
    }

    async fn read_model(&self, _: &Context) -> Result<AuthorizationModel> {
        let store = self.store_url()?;
        let model = match &self.model_id {
            Some(id) => {
                let url = format!("{}/authorization-models/{}", store, id);
                let request = self.client.get(url);
                self.send::<api::ReadModelResponse>("model.read", request)
                    .await
                    .map(|response| Some(response.authorization_model))
            }
            None => {
                let url = format!("{}/authorization-models", store);
                let request = self.client.get(url).query(&[("page_size", "1")]);
                self.send::<api::ListModelsResponse>("model.latest", request)
                    .await
                    .map(|response| response.authorization_models.into_iter().next())
            }
        };
        let model = match model {
            Ok(model) => model,
            Err(error) if error.is::<ResourceNotFound>() || error.is::<BadRequest>() => {
                return Err(error.context(ModelUnavailable));
            }
            Err(error) => return Err(error),
        };
        match model {
            None => anyhow::bail!(ModelUnavailable),
            Some(model) => Ok(model),
        }
    }

    async fn read_tuples(
        &self,
        _: &Context,
        filter: &TupleFilter,
        continuation: Option<String>,
    ) -> Result<TuplePage> {
        let url = format!("{}/read", self.store_url()?);
        let body = api::ReadTuplesRequest {
            tuple_key: filter,
            page_size: READ_PAGE_SIZE,
            continuation_token: continuation,
        };
        let request = self.client.post(url).json(&body);
        let response: api::ReadTuplesResponse = self.send("tuples.read", request).await?;
        let continuation_token = response
            .continuation_token
            .filter(|token| !token.is_empty());
        let tuples = response.tuples.into_iter().map(|record| record.key).collect();
        Ok(TuplePage {
            continuation_token,
            tuples,
        })
    }

    fn set_store_id(&self, id: &str) {
        let mut store_id = self
            .store_id
            .write()
            .expect("HttpFga::store_id lock poisoned");
        *store_id = Some(id.to_string());
    }

    async fn write_model(&self, context: &Context, model: &AuthorizationModel) -> Result<String> {
        let url = format!("{}/authorization-models", self.store_url()?);
        let request = self.client.post(url).json(model);
        let response: api::WriteModelResponse = self
            .send("model.write", request)
            .await
            .map_err(|error| match error.is::<BadRequest>() {
                true => error.context(InvalidModel),
                false => error,
            })?;
        slog::info!(
            context.logger, "Wrote authorization model";
            "model_id" => &response.authorization_model_id,
        );
        Ok(response.authorization_model_id)
    }

    async fn write_tuples(&self, _: &Context, tuples: Vec<Tuple>) -> Result<()> {
        let request = api::WriteRequest {
            authorization_model_id: self.model_id.clone(),
            writes: Some(api::TupleKeys { tuple_keys: tuples }),
            ..Default::default()
        };
        self.write("tuples.write", request).await
    }
}
