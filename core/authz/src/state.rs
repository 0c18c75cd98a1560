//! Lifecycle of an [`Authorizer`](crate::Authorizer).
use std::fmt;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

/// Lifecycle states of an [`Authorizer`](crate::Authorizer).
///
/// ```text
/// Constructed -> ValidatingModel -> Ready -> Draining -> Stopped
///                      |
///                      +-> Failed
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum AuthorizerState {
    /// The authorizer was created but the store model was not validated yet.
    Constructed = 0,

    /// The store model is being validated.
    ValidatingModel = 1,

    /// The store model matched and entitlement changes are accepted.
    Ready = 2,

    /// Shutdown started and queued entitlement changes are being completed.
    Draining = 3,

    /// The worker pool is stopped.
    Stopped = 4,

    /// The store model did not match or could not be fetched.
    Failed = 5,
}

impl AuthorizerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizerState::Constructed => "constructed",
            AuthorizerState::ValidatingModel => "validating_model",
            AuthorizerState::Ready => "ready",
            AuthorizerState::Draining => "draining",
            AuthorizerState::Stopped => "stopped",
            AuthorizerState::Failed => "failed",
        }
    }

    fn from_u8(value: u8) -> AuthorizerState {
        match value {
            0 => AuthorizerState::Constructed,
            1 => AuthorizerState::ValidatingModel,
            2 => AuthorizerState::Ready,
            3 => AuthorizerState::Draining,
            4 => AuthorizerState::Stopped,
            _ => AuthorizerState::Failed,
        }
    }
}

impl fmt::Display for AuthorizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Atomically updated [`AuthorizerState`] shared by authorizer clones.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: AuthorizerState) -> StateCell {
        StateCell(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> AuthorizerState {
        AuthorizerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `to` only if the current state is one of `from`.
    ///
    /// Returns the state found before the transition was attempted.
    pub fn transition(
        &self,
        from: &[AuthorizerState],
        to: AuthorizerState,
    ) -> Result<AuthorizerState, AuthorizerState> {
        let mut current = self.get();
        loop {
            if !from.contains(&current) {
                return Err(current);
            }
            match self.0.compare_exchange(
                current as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current),
                Err(actual) => current = AuthorizerState::from_u8(actual),
            }
        }
    }

    pub fn set(&self, state: AuthorizerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
