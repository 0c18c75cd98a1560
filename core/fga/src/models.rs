//! Data exchanged with relationship-based authorization stores.
use std::fmt;

use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as Json;

use crate::errors::InvalidTuple;

/// Schema (type definitions, relations and conditions) enforced by an authorization store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationModel {
    /// Identifier assigned to the model by the store, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Version of the modelling language the model is written in.
    pub schema_version: String,

    /// Object types known to the store and the relations they support.
    pub type_definitions: Vec<Json>,

    /// Named conditions relations can be subject to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Json>,
}

impl AuthorizationModel {
    /// Decode an [`AuthorizationModel`] from its JSON representation.
    pub fn from_json(model: &str) -> Result<AuthorizationModel> {
        let model = serde_json::from_str(model)?;
        Ok(model)
    }

    /// Return a copy of the model without a store assigned ID.
    ///
    /// Models are written to stores without IDs as stores assign their own.
    pub fn without_id(&self) -> AuthorizationModel {
        let mut model = self.clone();
        model.id = None;
        model
    }
}

/// A relationship in the form `object#relation@user`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Tuple {
    /// Object the relationship is about, in the `type:id` format.
    pub object: String,

    /// Relation between the user and the object.
    pub relation: String,

    /// User (or userset) the relationship is granted to, in the `type:id` format.
    pub user: String,
}

impl Tuple {
    /// Define a relationship tuple.
    pub fn new<S1, S2, S3>(user: S1, relation: S2, object: S3) -> Tuple
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Tuple {
            object: object.into(),
            relation: relation.into(),
            user: user.into(),
        }
    }

    /// Check the tuple is well formed before it is sent to a store.
    pub fn validate(&self) -> Result<()> {
        let object_ok = is_typed_id(&self.object);
        let user_ok = is_typed_id(&self.user);
        let relation_ok = !self.relation.is_empty() && !self.relation.contains([':', '#', '@']);
        if !(object_ok && user_ok && relation_ok) {
            anyhow::bail!(InvalidTuple(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)
    }
}

/// Select tuples to read from a store.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TupleFilter {
    /// Object to read tuples for, in the `type:id` format.
    pub object: String,

    /// Only return tuples with this relation, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    /// Only return tuples for this user, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl TupleFilter {
    /// Select all tuples about an object.
    pub fn object<S: Into<String>>(object: S) -> TupleFilter {
        TupleFilter {
            object: object.into(),
            relation: None,
            user: None,
        }
    }

    /// Check if a tuple is selected by the filter.
    pub fn matches(&self, tuple: &Tuple) -> bool {
        let relation = self
            .relation
            .as_ref()
            .map(|relation| relation == &tuple.relation)
            .unwrap_or(true);
        let user = self
            .user
            .as_ref()
            .map(|user| user == &tuple.user)
            .unwrap_or(true);
        self.object == tuple.object && relation && user
    }
}

/// A page of tuples returned by a read.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TuplePage {
    /// Token to request the next page with, if more tuples are available.
    pub continuation_token: Option<String>,

    /// Tuples in this page.
    pub tuples: Vec<Tuple>,
}

/// Check a string is in the `type:id` format, with an optional `#relation` userset suffix.
fn is_typed_id(value: &str) -> bool {
    let value = match value.split_once('#') {
        None => value,
        Some((value, relation)) if !relation.is_empty() => value,
        Some(_) => return false,
    };
    match value.split_once(':') {
        None => false,
        Some((kind, id)) => !kind.is_empty() && !id.is_empty(),
    }
}
