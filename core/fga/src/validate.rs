//! Structural comparison of authorization models.
use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Map;
use serde_json::Value as Json;

use crate::errors::ModelMismatch;
use crate::models::AuthorizationModel;

/// Key marking relations users can be directly assigned, always an empty object.
const DIRECT_RELATION: &str = "this";

/// Compare the model found in a store with the model the process expects.
///
/// Models are compared on their content, not their IDs:
///
/// - Schema versions must be equal.
/// - Type definitions are matched by type name, regardless of their order.
/// - Conditions must be equal.
///
/// Missing attributes, `null`s, empty strings and empty collections are treated as
/// equivalent since stores are free to omit or fill in empty attributes in their responses.
pub fn compare(expected: &AuthorizationModel, actual: &AuthorizationModel) -> Result<()> {
    if expected.schema_version != actual.schema_version {
        let detail = format!(
            "schema version is '{}' but '{}' was expected",
            actual.schema_version, expected.schema_version,
        );
        anyhow::bail!(ModelMismatch(detail));
    }

    let expected_types = types_by_name(&expected.type_definitions)?;
    let actual_types = types_by_name(&actual.type_definitions)?;
    for (name, definition) in &expected_types {
        match actual_types.get(name) {
            None => anyhow::bail!(ModelMismatch(format!("type '{}' is missing", name))),
            Some(actual) if actual != definition => {
                anyhow::bail!(ModelMismatch(format!("type '{}' is different", name)))
            }
            Some(_) => (),
        }
    }
    if let Some(name) = actual_types
        .keys()
        .find(|name| !expected_types.contains_key(*name))
    {
        anyhow::bail!(ModelMismatch(format!("type '{}' is not expected", name)));
    }

    let expected_conditions = expected.conditions.clone().and_then(normalise);
    let actual_conditions = actual.conditions.clone().and_then(normalise);
    if expected_conditions != actual_conditions {
        anyhow::bail!(ModelMismatch(String::from("conditions are different")));
    }
    Ok(())
}

/// Index normalised type definitions by their type name.
fn types_by_name(definitions: &[Json]) -> Result<BTreeMap<String, Json>> {
    let mut types = BTreeMap::new();
    for definition in definitions {
        let name = match definition.get("type").and_then(Json::as_str) {
            Some(name) => name.to_string(),
            None => anyhow::bail!(ModelMismatch(String::from(
                "found type definition without a type name"
            ))),
        };
        let definition = normalise(definition.clone()).unwrap_or(Json::Null);
        if types.insert(name.clone(), definition).is_some() {
            anyhow::bail!(ModelMismatch(format!("type '{}' is defined twice", name)));
        }
    }
    Ok(types)
}

/// Strip `null`s, empty strings and empty collections from a JSON value, recursively.
///
/// Direct relation markers are kept even though they are empty objects.
/// Returns `None` if nothing is left of the value.
fn normalise(value: Json) -> Option<Json> {
    match value {
        Json::Null => None,
        Json::String(value) if value.is_empty() => None,
        Json::Array(items) => {
            let items: Vec<Json> = items.into_iter().filter_map(normalise).collect();
            if items.is_empty() {
                None
            } else {
                Some(Json::Array(items))
            }
        }
        Json::Object(map) => {
            let map: Map<String, Json> = map
                .into_iter()
                .filter_map(|(key, value)| {
                    if key == DIRECT_RELATION {
                        return Some((key, Json::Object(Map::new())));
                    }
                    normalise(value).map(|value| (key, value))
                })
                .collect();
            if map.is_empty() {
                None
            } else {
                Some(Json::Object(map))
            }
        }
        value => Some(value),
    }
}
