//! JSON Schema resolution, merging and per-field inference
//!
//! The resolver turns a raw schema into a compiled schema plus the lookup
//! tables the layout compiler needs. The remaining modules answer per-field
//! questions about a compiled schema: which control type fits, which
//! options apply, whether the field is required.

pub mod from_data;
pub mod input_type;
pub mod lookup;
pub mod merge;
pub mod options;
pub mod resolver;
pub mod validators;

pub use from_data::build_schema_from_data;
pub use input_type::{check_inline_type, get_input_type};
pub use lookup::{
    get_from_schema, get_parent_from_schema, is_input_required, remove_recursive_references,
    to_schema_pointer,
};
pub use merge::{combine_all_of, combine_schemas, fix_required_array_properties, merge_schemas};
pub use options::{get_title_map_from_oneof, has_title_map_in_oneof, update_input_options};
pub use resolver::{resolve_schema_references, RefLink, ReferenceGraph, ResolvedSchema};
pub use validators::get_control_validators;

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Schema pointer → resolved sub-schema
pub type RefLibrary = BTreeMap<String, Value>;

/// Pointer → shallowest equivalent pointer
pub type RecursiveRefMap = BTreeMap<String, String>;

/// Generic data pointer of an array → number of tuple positions
pub type ArrayMap = HashMap<String, usize>;

/// Keywords whose values are data, never sub-schemas
pub(crate) const DATA_KEYWORDS: &[&str] = &[
    "enum",
    "const",
    "default",
    "examples",
    "required",
    "titleMap",
    "enumNames",
    "x-schema-form",
    "ui:order",
    "ui:widget",
];

/// Keywords whose values map arbitrary names to sub-schemas
pub(crate) const SCHEMA_MAP_KEYWORDS: &[&str] =
    &["properties", "patternProperties", "definitions", "$defs", "dependencies"];

/// How a value inside a schema document should be read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SchemaRole {
    /// A schema (or a list of schemas)
    Schema,
    /// A map of names to schemas
    SchemaMap,
}

impl SchemaRole {
    pub(crate) fn of_keyword(key: &str) -> Option<Self> {
        if DATA_KEYWORDS.contains(&key) {
            None
        } else if SCHEMA_MAP_KEYWORDS.contains(&key) {
            Some(SchemaRole::SchemaMap)
        } else {
            Some(SchemaRole::Schema)
        }
    }
}

/// Visit every schema object in a schema document, pre-order, skipping
/// data-valued keywords
pub(crate) fn walk_schemas<F>(value: &Value, pointer: &str, role: SchemaRole, f: &mut F)
where
    F: FnMut(&Map<String, Value>, &str),
{
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk_schemas(item, &format!("{}/{}", pointer, index), SchemaRole::Schema, f);
            }
        }
        Value::Object(map) if role == SchemaRole::SchemaMap => {
            for (name, child) in map {
                let child_pointer = format!("{}/{}", pointer, crate::pointer::escape(name));
                walk_schemas(child, &child_pointer, SchemaRole::Schema, f);
            }
        }
        Value::Object(map) => {
            f(map, pointer);
            for (key, child) in map {
                if let Some(child_role) = SchemaRole::of_keyword(key) {
                    let child_pointer = format!("{}/{}", pointer, crate::pointer::escape(key));
                    walk_schemas(child, &child_pointer, child_role, f);
                }
            }
        }
        _ => {}
    }
}

/// The schema's type as a single name. Type lists resolve to the most
/// inclusive member.
pub fn schema_type(schema: &Value) -> Option<String> {
    match schema.get("type")? {
        Value::String(t) => Some(t.clone()),
        Value::Array(types) => {
            let has = |name: &str| types.iter().any(|t| t.as_str() == Some(name));
            let resolved = if has("object") && schema.get("properties").is_some() {
                "object"
            } else if has("array") && schema.get("items").is_some() {
                "array"
            } else if has("string") {
                "string"
            } else if has("number") {
                "number"
            } else if has("integer") {
                "integer"
            } else if has("boolean") {
                "boolean"
            } else {
                "null"
            };
            Some(resolved.to_string())
        }
        _ => None,
    }
}

/// Null, `{}` and `[]` count as empty
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_type_prefers_inclusive_type() {
        assert_eq!(schema_type(&json!({ "type": "string" })).unwrap(), "string");
        assert_eq!(
            schema_type(&json!({ "type": ["null", "integer", "string"] })).unwrap(),
            "string"
        );
        assert_eq!(
            schema_type(&json!({ "type": ["object", "null"], "properties": {} })).unwrap(),
            "object"
        );
        assert!(schema_type(&json!({})).is_none());
    }

    #[test]
    fn test_walk_schemas_skips_data_keywords() {
        let schema = json!({
            "properties": {
                "enum": { "type": "string", "default": { "$ref": "#/not-a-schema" } }
            },
            "enum": [{ "type": "boolean" }]
        });
        let mut seen = Vec::new();
        walk_schemas(&schema, "", SchemaRole::Schema, &mut |_, pointer| {
            seen.push(pointer.to_string())
        });
        assert_eq!(seen, vec!["", "/properties/enum"]);
    }
}
