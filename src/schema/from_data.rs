//! Schema inference from sample data

use serde_json::{json, Map, Value};
use std::collections::HashSet;

const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-06/schema#";

/// Infer a schema describing `data`.
///
/// Integers widen to `number` and nulls to `string`. Arrays whose items
/// all share one type collapse to a single `items` schema. With
/// `require_all_fields`, every object property is required and every
/// array needs at least one item.
pub fn build_schema_from_data(data: &Value, require_all_fields: bool) -> Value {
    let mut schema = build_sub_schema(data, require_all_fields);
    if let Value::Object(map) = &mut schema {
        let mut rooted = Map::new();
        rooted.insert("$schema".to_string(), json!(SCHEMA_DRAFT));
        rooted.append(map);
        *map = rooted;
    }
    schema
}

fn field_type(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn build_sub_schema(data: &Value, require_all_fields: bool) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!(field_type(data)));

    match data {
        Value::Object(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|(key, value)| (key.clone(), build_sub_schema(value, require_all_fields)))
                .collect();
            schema.insert("properties".to_string(), Value::Object(properties));
            if require_all_fields {
                let required: Vec<Value> = fields.keys().map(|k| json!(k)).collect();
                schema.insert("required".to_string(), Value::Array(required));
            }
        }
        Value::Array(values) => {
            let item_schemas: Vec<Value> = values
                .iter()
                .map(|value| build_sub_schema(value, require_all_fields))
                .collect();
            let types: HashSet<&str> = values.iter().map(field_type).collect();
            let items = if types.len() == 1 {
                let mut combined = Map::new();
                for item in item_schemas {
                    if let Value::Object(mut fields) = item {
                        combined.append(&mut fields);
                    }
                }
                Value::Object(combined)
            } else {
                Value::Array(item_schemas)
            };
            schema.insert("items".to_string(), items);
            if require_all_fields {
                schema.insert("minItems".to_string(), json!(1));
            }
        }
        _ => {}
    }
    Value::Object(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_schema() {
        let schema = build_schema_from_data(&json!({ "name": "Ada", "age": 36, "nick": null }), false);
        assert_eq!(schema["$schema"], SCHEMA_DRAFT);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"], json!({ "type": "string" }));
        assert_eq!(schema["properties"]["age"], json!({ "type": "number" }));
        assert_eq!(schema["properties"]["nick"], json!({ "type": "string" }));
        assert!(schema.get("required").is_none());
        assert!(schema["properties"]["name"].get("$schema").is_none());
    }

    #[test]
    fn test_homogeneous_array_collapses() {
        let schema = build_schema_from_data(&json!({ "tags": ["a", "b"], "mixed": [1, "x"] }), true);
        assert_eq!(schema["required"], json!(["tags", "mixed"]));
        assert_eq!(schema["properties"]["tags"]["items"], json!({ "type": "string" }));
        assert_eq!(schema["properties"]["tags"]["minItems"], 1);
        assert_eq!(
            schema["properties"]["mixed"]["items"],
            json!([{ "type": "number" }, { "type": "string" }])
        );
    }
}
