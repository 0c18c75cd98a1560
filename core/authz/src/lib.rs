//! Propagate entitlement changes for resources to the authorization store.
//!
//! Every resource managed by the process (OAuth2 clients, identity providers,
//! proxy rules and identity schemas) is an object in the authorization store.
//! When a resource is created its owner relation is granted to the system actor
//! and when it is deleted every relation on it is revoked.
//!
//! Changes are applied in the background by a [`WorkerPool`](authsync_pool::WorkerPool)
//! on a best-effort basis: resources are the source of truth and the store is a projection
//! of them that may lag behind or, when changes fail, miss some of them.
mod authorizer;
mod kind;
mod model;
mod state;
mod telemetry;

pub mod errors;


pub use self::authorizer::Authorizer;
pub use self::kind::Entitlement;
pub use self::kind::Operation;
pub use self::kind::ResourceKind;
pub use self::kind::OWNER_RELATION;
pub use self::kind::SUPERUSER;
pub use self::model::expected_model;
pub use self::model::EmbeddedModelInvalid;
pub use self::model::EXPECTED_MODEL_JSON;
pub use self::state::AuthorizerState;
pub use self::telemetry::register_metrics;
