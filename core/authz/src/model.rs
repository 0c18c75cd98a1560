//! Authorization model the process expects the store to enforce.
use anyhow::Context;
use anyhow::Result;

use authsync_fga::AuthorizationModel;

/// JSON definition of the expected authorization model.
pub const EXPECTED_MODEL_JSON: &str = include_str!("../model/authorization_model.json");

/// The embedded authorization model is not valid.
#[derive(Debug, thiserror::Error)]
#[error("the embedded authorization model is not valid")]
pub struct EmbeddedModelInvalid;

/// Decode the authorization model embedded in the binary.
pub fn expected_model() -> Result<AuthorizationModel> {
    AuthorizationModel::from_json(EXPECTED_MODEL_JSON).context(EmbeddedModelInvalid)
}

#[cfg(test)]
mod tests {
    use super::expected_model;
    use crate::ResourceKind;

    #[test]
    fn embedded_model_decodes() {
        let model = expected_model().unwrap();
        assert_eq!(model.schema_version, "1.1");
        assert!(model.id.is_none());
    }

    #[test]
    fn embedded_model_covers_resource_kinds() {
        let model = expected_model().unwrap();
        for kind in ResourceKind::ALL {
            let definition = model
                .type_definitions
                .iter()
                .find(|definition| definition["type"] == kind.object_type())
                .unwrap_or_else(|| panic!("missing type {}", kind));
            for relation in ["owner", "can_view", "can_edit", "can_delete"] {
                assert!(
                    definition["relations"].get(relation).is_some(),
                    "type {} is missing relation {}",
                    kind,
                    relation,
                );
            }
        }
    }
}
