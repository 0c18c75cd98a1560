//! Errors reported by authorization store clients.
//!
//! Backends attach these errors (as [`anyhow`] context) to the failures they report
//! so callers can tell failure kinds apart with `error.is::<T>()`.

/// The authorization model was rejected by the store.
#[derive(Debug, thiserror::Error)]
#[error("the authorization model was rejected by the store")]
pub struct InvalidModel;

/// A relationship tuple was rejected as invalid.
#[derive(Debug, thiserror::Error)]
#[error("invalid relationship tuple '{0}'")]
pub struct InvalidTuple(pub String);

/// The authorization model in the store does not match the expected model.
#[derive(Debug, thiserror::Error)]
#[error("authorization model in the store does not match the expected model: {0}")]
pub struct ModelMismatch(pub String);

/// Unable to fetch the authorization model from the store.
#[derive(Debug, thiserror::Error)]
#[error("unable to fetch the authorization model from the store")]
pub struct ModelUnavailable;

/// No store is selected for operations that need one.
#[derive(Debug, thiserror::Error)]
#[error("no authorization store is selected for the client")]
pub struct StoreNotSelected;

/// The authorization store could not be reached or failed to process the request.
#[derive(Debug, thiserror::Error)]
#[error("the authorization store is unavailable")]
pub struct StoreUnavailable;

/// The store rejected the client credentials.
#[derive(Debug, thiserror::Error)]
#[error("the authorization store rejected the client credentials")]
pub struct Unauthorized;
