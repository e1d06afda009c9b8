//! Data-pointer lookups against a compiled schema

use serde_json::{json, Value};
use tracing::warn;

use super::{ArrayMap, RecursiveRefMap};
use crate::pointer::{self, WILDCARD};

/// Walk a data pointer into the schema, collecting the schema pointer on
/// the way. With `parent` set, the walk stops one segment early.
fn locate(schema: &Value, data_pointer: &str, parent: bool) -> Option<(Value, Vec<String>)> {
    let Some(mut keys) = pointer::parse(data_pointer) else {
        warn!("Invalid data pointer: {}", data_pointer);
        return None;
    };
    if parent {
        keys.pop()?;
    }

    let mut sub_schema = schema;
    let mut synthetic = None;
    let mut schema_pointer = Vec::new();

    for key in &keys {
        let is_array = sub_schema.get("type").and_then(Value::as_str) == Some("array")
            || sub_schema.get("items").is_some();
        let is_object = sub_schema.get("type").and_then(Value::as_str) == Some("object")
            || sub_schema.get("properties").is_some();
        let index = key.parse::<usize>().ok();
        let mut found = None;

        if is_array && (index.is_some() || key == WILDCARD) {
            match sub_schema.get("items") {
                Some(items @ Value::Object(_)) => {
                    schema_pointer.push("items".to_string());
                    found = Some(items);
                }
                Some(Value::Array(tuple)) => {
                    if let Some(item) = index.and_then(|i| tuple.get(i)) {
                        schema_pointer.push("items".to_string());
                        schema_pointer.push(key.clone());
                        found = Some(item);
                    }
                }
                _ => {}
            }
            if found.is_none() {
                match sub_schema.get("additionalItems") {
                    Some(additional @ Value::Object(_)) => found = Some(additional),
                    Some(Value::Bool(false)) => {}
                    _ => synthetic = Some(json!({})),
                }
                if found.is_some() || synthetic.is_some() {
                    schema_pointer.push("additionalItems".to_string());
                }
            }
        } else if is_object {
            if let Some(property) = sub_schema.get("properties").and_then(|p| p.get(key)) {
                schema_pointer.push("properties".to_string());
                schema_pointer.push(key.clone());
                found = Some(property);
            } else {
                match sub_schema.get("additionalProperties") {
                    Some(additional @ Value::Object(_)) => found = Some(additional),
                    Some(Value::Bool(false)) => {}
                    _ => synthetic = Some(json!({})),
                }
                if found.is_some() || synthetic.is_some() {
                    schema_pointer.push("additionalProperties".to_string());
                }
            }
        }

        match found {
            Some(next) => sub_schema = next,
            None if synthetic.is_some() => {
                // An open schema accepts anything below this point
                return synthetic.map(|s| (s, schema_pointer));
            }
            None => {
                warn!("Unable to find \"{}\" in schema for {}", key, data_pointer);
                return None;
            }
        }
    }
    Some((sub_schema.clone(), schema_pointer))
}

/// Schema describing the value at `data_pointer`
pub fn get_from_schema(schema: &Value, data_pointer: &str) -> Option<Value> {
    locate(schema, data_pointer, false).map(|(found, _)| found)
}

/// Schema of the object or array containing the value at `data_pointer`
pub fn get_parent_from_schema(schema: &Value, data_pointer: &str) -> Option<Value> {
    locate(schema, data_pointer, true).map(|(found, _)| found)
}

/// Schema pointer for a data pointer (`/tags/-` → `/properties/tags/items`)
pub fn to_schema_pointer(data_pointer: &str, schema: &Value) -> Option<String> {
    locate(schema, data_pointer, false).map(|(_, segments)| pointer::compile(&segments))
}

/// Whether the field at `schema_pointer` is required by its parent schema
pub fn is_input_required(schema: &Value, schema_pointer: &str) -> bool {
    if !schema.is_object() {
        warn!("is_input_required: schema must be an object");
        return false;
    }
    let Some(mut segments) = pointer::parse(schema_pointer) else {
        return false;
    };
    let Some(key) = segments.pop() else {
        return schema.get("required") == Some(&Value::Bool(true));
    };
    if matches!(
        segments.last().map(String::as_str),
        Some("properties" | "additionalProperties" | "patternProperties" | "items" | "additionalItems")
    ) {
        segments.pop();
    }
    let parent = pointer::get(schema, &pointer::compile(&segments));
    let Some(parent) = parent else {
        return false;
    };
    if let Some(required) = parent.get("required").and_then(Value::as_array) {
        return required.iter().any(|r| r.as_str() == Some(key.as_str()));
    }
    if parent.get("type").and_then(Value::as_str) == Some("array") {
        let min_items = parent.get("minItems").and_then(Value::as_u64);
        let index = key.parse::<u64>().ok();
        if let (Some(min_items), Some(index)) = (min_items, index) {
            return min_items > index;
        }
    }
    false
}

/// Rewrite a pointer to its shallowest equivalent under a recursive
/// reference map.
///
/// ```text
/// pointer:   /tree/children/3/children/0/name
/// map:       /tree/children/- → /tree
/// result:    /tree/name
/// ```
///
/// Only rules whose target is a strict ancestor of their source are applied,
/// so every rewrite removes at least one segment and the loop is bounded.
pub fn remove_recursive_references(
    pointer: &str,
    recursive_ref_map: &RecursiveRefMap,
    array_map: &ArrayMap,
) -> String {
    if pointer.is_empty() {
        return String::new();
    }
    let mut generic = pointer::to_generic_pointer(pointer, array_map);
    loop {
        let mut rewritten = false;
        for (from, to) in recursive_ref_map {
            if from == to || !pointer::is_sub_pointer(to, from) {
                continue;
            }
            while pointer::is_sub_pointer(from, &generic) {
                let rest = &generic[from.len()..];
                generic = pointer::to_generic_pointer(&format!("{}{}", to, rest), array_map);
                rewritten = true;
            }
        }
        if !rewritten {
            return generic;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "tags": {
                    "type": "array",
                    "minItems": 2,
                    "items": { "type": "string" }
                },
                "point": {
                    "type": "array",
                    "items": [{ "type": "number" }, { "type": "number" }],
                    "additionalItems": false
                }
            }
        })
    }

    #[test]
    fn test_get_from_schema() {
        let schema = sample_schema();
        assert_eq!(get_from_schema(&schema, "/name").unwrap()["type"], "string");
        assert_eq!(get_from_schema(&schema, "/tags/-").unwrap()["type"], "string");
        assert_eq!(get_from_schema(&schema, "/point/1").unwrap()["type"], "number");
        assert!(get_from_schema(&schema, "/point/2").is_none());
        assert_eq!(get_parent_from_schema(&schema, "/tags/3").unwrap()["minItems"], 2);
    }

    #[test]
    fn test_open_object_yields_empty_schema() {
        let schema = json!({ "type": "object", "properties": {} });
        assert_eq!(get_from_schema(&schema, "/anything").unwrap(), json!({}));
        assert_eq!(to_schema_pointer("/anything", &schema).unwrap(), "/additionalProperties");
    }

    #[test]
    fn test_to_schema_pointer() {
        let schema = sample_schema();
        assert_eq!(to_schema_pointer("/tags/-", &schema).unwrap(), "/properties/tags/items");
        assert_eq!(to_schema_pointer("/point/0", &schema).unwrap(), "/properties/point/items/0");
        assert_eq!(to_schema_pointer("", &schema).unwrap(), "");
    }

    #[test]
    fn test_is_input_required() {
        let schema = sample_schema();
        assert!(is_input_required(&schema, "/properties/name"));
        assert!(!is_input_required(&schema, "/properties/tags"));
        assert!(is_input_required(&schema, "/properties/tags/items/1"));
        assert!(!is_input_required(&schema, "/properties/tags/items/2"));
    }

    #[test]
    fn test_remove_recursive_references() {
        let mut map = RecursiveRefMap::new();
        map.insert("/tree/children/-".to_string(), "/tree".to_string());
        let mut array_map = ArrayMap::new();
        array_map.insert("/tree/children".to_string(), 0);

        assert_eq!(
            remove_recursive_references("/tree/children/3/children/0/name", &map, &array_map),
            "/tree/name"
        );
        assert_eq!(remove_recursive_references("/tree/name", &map, &array_map), "/tree/name");
        assert_eq!(remove_recursive_references("", &map, &array_map), "");
    }
}
