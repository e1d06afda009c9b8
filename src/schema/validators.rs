//! Per-control validator metadata

use serde_json::{Map, Value};

const STRING_KEYWORDS: &[&str] = &["pattern", "format", "minLength", "maxLength"];
const NUMBER_KEYWORDS: &[&str] = &["multipleOf", "type"];
const OBJECT_KEYWORDS: &[&str] = &["minProperties", "maxProperties", "dependencies"];
const ARRAY_KEYWORDS: &[&str] = &["minItems", "maxItems", "uniqueItems"];

/// Collect the validation keywords that apply to a control.
///
/// Each entry maps a validator name to its argument list, e.g.
/// `minimum → [0, true]` for an exclusive lower bound.
pub fn get_control_validators(schema: &Value) -> Map<String, Value> {
    let mut validators = Map::new();
    let Some(map) = schema.as_object() else {
        return validators;
    };

    let copy = |validators: &mut Map<String, Value>, keywords: &[&str]| {
        for keyword in keywords {
            if let Some(value) = map.get(*keyword) {
                validators.insert(keyword.to_string(), Value::Array(vec![value.clone()]));
            }
        }
    };

    match map.get("type").and_then(Value::as_str) {
        Some("string") => copy(&mut validators, STRING_KEYWORDS),
        Some("number" | "integer") => {
            for (limit, exclusive) in [("minimum", "exclusiveMinimum"), ("maximum", "exclusiveMaximum")] {
                if let Some(bound) = map.get(limit) {
                    let is_exclusive = map.get(exclusive) == Some(&Value::Bool(true));
                    validators.insert(
                        limit.to_string(),
                        Value::Array(vec![bound.clone(), Value::Bool(is_exclusive)]),
                    );
                }
            }
            copy(&mut validators, NUMBER_KEYWORDS);
        }
        Some("object") => copy(&mut validators, OBJECT_KEYWORDS),
        Some("array") => copy(&mut validators, ARRAY_KEYWORDS),
        _ => {}
    }

    if let Some(values) = map.get("enum") {
        validators.insert("enum".to_string(), Value::Array(vec![values.clone()]));
    }
    validators
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_validators() {
        let validators = get_control_validators(&json!({
            "type": "string",
            "minLength": 2,
            "pattern": "^[a-z]+$",
            "enum": ["ab", "cd"]
        }));
        assert_eq!(validators["minLength"], json!([2]));
        assert_eq!(validators["pattern"], json!(["^[a-z]+$"]));
        assert_eq!(validators["enum"], json!([["ab", "cd"]]));
        assert!(!validators.contains_key("maxLength"));
    }

    #[test]
    fn test_number_bounds_carry_exclusive_flag() {
        let validators = get_control_validators(&json!({
            "type": "integer",
            "minimum": 0,
            "exclusiveMinimum": true,
            "maximum": 9
        }));
        assert_eq!(validators["minimum"], json!([0, true]));
        assert_eq!(validators["maximum"], json!([9, false]));
        assert_eq!(validators["type"], json!(["integer"]));
    }

    #[test]
    fn test_structural_validators() {
        let array = get_control_validators(&json!({ "type": "array", "maxItems": 3, "uniqueItems": true }));
        assert_eq!(array["maxItems"], json!([3]));
        assert_eq!(array["uniqueItems"], json!([true]));

        let object = get_control_validators(&json!({ "type": "object", "minProperties": 1 }));
        assert_eq!(object["minProperties"], json!([1]));

        assert!(get_control_validators(&json!("not a schema")).is_empty());
    }
}
