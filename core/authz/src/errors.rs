//! Errors reported by the [`Authorizer`](crate::Authorizer).
use crate::AuthorizerState;

/// The authorizer is not in a state that allows the operation.
#[derive(Debug, thiserror::Error)]
#[error("authorizer is {state} and can't {operation}")]
pub struct InvalidState {
    pub operation: &'static str,
    pub state: AuthorizerState,
}

/// The authorization model in the store failed validation.
#[derive(Debug, thiserror::Error)]
#[error("the authorization model in the store failed validation")]
pub struct ModelValidationFailed;
