//! Resource kinds with entitlements and the changes applied to them.
use std::fmt;

use authsync_fga::Tuple;
use authsync_fga::TupleFilter;

/// Fixed system actor granted ownership of every resource.
pub const SUPERUSER: &str = "privileged:superuser";

/// The only relation written directly for resources, all others are computed from it.
pub const OWNER_RELATION: &str = "owner";

/// Kinds of resources that carry entitlements in the authorization store.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResourceKind {
    /// OAuth2 clients.
    Client,

    /// Identity provider configurations.
    IdentityProvider,

    /// Reverse proxy rules.
    Rule,

    /// Identity schemas.
    Schema,
}

impl ResourceKind {
    /// Every known resource kind.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Client,
        ResourceKind::IdentityProvider,
        ResourceKind::Rule,
        ResourceKind::Schema,
    ];

    /// Object type of the resource kind in the authorization model.
    pub fn object_type(&self) -> &'static str {
        match self {
            ResourceKind::Client => "client",
            ResourceKind::IdentityProvider => "identity_provider",
            ResourceKind::Rule => "rule",
            ResourceKind::Schema => "schema",
        }
    }

    /// Store object for the resource with the given ID.
    pub fn object(&self, id: &str) -> String {
        format!("{}:{}", self.object_type(), id)
    }

    /// Tuples to grant when a resource of this kind is created.
    pub fn grants(&self, id: &str, actor: &str) -> Vec<Tuple> {
        vec![Tuple::new(actor, OWNER_RELATION, self.object(id))]
    }

    /// Select the tuples to revoke when a resource of this kind is deleted.
    pub fn revocations(&self, id: &str) -> TupleFilter {
        TupleFilter::object(self.object(id))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object_type())
    }
}

/// Change to apply to the entitlements of a resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Grant ownership of a newly created resource.
    Grant,

    /// Revoke every relation on a deleted resource.
    Revoke,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Grant => "grant",
            Operation::Revoke => "revoke",
        }
    }
}

/// Entitlement change for a single resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entitlement {
    /// User the change is applied for.
    pub actor: String,

    /// Kind of the resource the change applies to.
    pub kind: ResourceKind,

    /// Change to apply.
    pub operation: Operation,

    /// ID of the resource the change applies to.
    pub resource_id: String,
}

impl Entitlement {
    /// Grant the implicit actor ownership of a resource.
    pub fn grant<S: Into<String>>(kind: ResourceKind, resource_id: S) -> Entitlement {
        Entitlement {
            actor: SUPERUSER.to_string(),
            kind,
            operation: Operation::Grant,
            resource_id: resource_id.into(),
        }
    }

    /// Revoke all relations on a resource.
    pub fn revoke<S: Into<String>>(kind: ResourceKind, resource_id: S) -> Entitlement {
        Entitlement {
            actor: SUPERUSER.to_string(),
            kind,
            operation: Operation::Revoke,
            resource_id: resource_id.into(),
        }
    }
}
