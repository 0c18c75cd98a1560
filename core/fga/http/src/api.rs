//! Request and response payloads of the store JSON API.
use serde::Deserialize;
use serde::Serialize;

use authsync_fga::AuthorizationModel;
use authsync_fga::Tuple;
use authsync_fga::TupleFilter;

#[derive(Debug, Serialize)]
pub struct CreateStoreRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateStoreResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadModelResponse {
    pub authorization_model: AuthorizationModel,
}

#[derive(Debug, Deserialize)]
pub struct ListModelsResponse {
    #[serde(default)]
    pub authorization_models: Vec<AuthorizationModel>,
}

#[derive(Debug, Serialize)]
pub struct ReadTuplesRequest<'a> {
    pub tuple_key: &'a TupleFilter,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReadTuplesResponse {
    #[serde(default)]
    pub tuples: Vec<TupleRecord>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// Tuple as returned by reads, with store metadata around the key.
#[derive(Debug, Deserialize)]
pub struct TupleRecord {
    pub key: Tuple,
}

#[derive(Debug, Deserialize)]
pub struct WriteModelResponse {
    pub authorization_model_id: String,
}

#[derive(Debug, Default, Serialize)]
pub struct WriteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletes: Option<TupleKeys>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writes: Option<TupleKeys>,
}

#[derive(Debug, Serialize)]
pub struct TupleKeys {
    pub tuple_keys: Vec<Tuple>,
}

/// Responses with no data of interest.
#[derive(Debug, Deserialize)]
pub struct Empty {}
