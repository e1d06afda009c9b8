//! Schema combination rules for `allOf` collapsing and `$ref` sibling merging

use serde_json::{json, Map, Value};

use super::is_empty_value;

/// Keywords whose combined value is the tighter (smaller) bound
const MAX_KEYWORDS: &[&str] = &[
    "maximum",
    "exclusiveMaximum",
    "maxLength",
    "maxItems",
    "maxProperties",
];

/// Keywords whose combined value is the tighter (larger) bound
const MIN_KEYWORDS: &[&str] = &[
    "minimum",
    "exclusiveMinimum",
    "minLength",
    "minItems",
    "minProperties",
];

/// Combine two schemas into one schema enforcing both.
///
/// Conflicts that cannot be reduced produce `{"allOf": [a, b]}`.
pub fn combine_schemas(a: &Value, b: &Value) -> Value {
    if is_empty_value(a) {
        return b.clone();
    }
    if is_empty_value(b) {
        return a.clone();
    }
    let (Some(first), Some(second)) = (a.as_object(), b.as_object()) else {
        return json!({ "allOf": [a, b] });
    };

    let mut combined = first.clone();
    for (key, value2) in second {
        let value1 = match first.get(key) {
            None => {
                combined.insert(key.clone(), value2.clone());
                continue;
            }
            Some(value1) if value1 == value2 => continue,
            Some(value1) => value1,
        };
        match combine_keyword(key, value1, value2) {
            Some(value) => {
                combined.insert(key.clone(), value);
            }
            None => return json!({ "allOf": [a, b] }),
        }
    }
    Value::Object(combined)
}

fn combine_keyword(key: &str, value1: &Value, value2: &Value) -> Option<Value> {
    match key {
        "type" => intersect_types(value1, value2),
        "enum" | "anyOf" | "oneOf" | "additionalProperties" => match (value1, value2) {
            (Value::Array(list1), Value::Array(list2)) => Some(Value::Array(
                list1.iter().filter(|item| list2.contains(item)).cloned().collect(),
            )),
            (Value::Object(_), Value::Object(_)) => Some(combine_schemas(value1, value2)),
            (Value::Array(list), Value::Object(_)) => Some(Value::Array(
                list.iter().map(|item| combine_schemas(item, value2)).collect(),
            )),
            (Value::Object(_), Value::Array(list)) => Some(Value::Array(
                list.iter().map(|item| combine_schemas(item, value1)).collect(),
            )),
            _ => None,
        },
        "allOf" | "required" => match (value1, value2) {
            (Value::Array(list1), Value::Array(list2)) => {
                let mut union = list1.clone();
                union.extend(list2.iter().filter(|item| !list1.contains(item)).cloned());
                Some(Value::Array(union))
            }
            _ => None,
        },
        "multipleOf" => match (value1.as_f64(), value2.as_f64()) {
            (Some(x), Some(y)) => Some(number_value(lcm(x, y))),
            _ => None,
        },
        "uniqueItems" => Some(Value::Bool(is_truthy(value1) || is_truthy(value2))),
        _ if MAX_KEYWORDS.contains(&key) => match (value1.as_f64(), value2.as_f64()) {
            (Some(x), Some(y)) => Some(if y < x { value2.clone() } else { value1.clone() }),
            _ => None,
        },
        _ if MIN_KEYWORDS.contains(&key) => match (value1.as_f64(), value2.as_f64()) {
            (Some(x), Some(y)) => Some(if y > x { value2.clone() } else { value1.clone() }),
            _ => None,
        },
        _ => None,
    }
}

/// `type` accepts a name or a list of names; a single survivor collapses
/// back to a plain name
fn intersect_types(value1: &Value, value2: &Value) -> Option<Value> {
    let as_list = |value: &Value| -> Option<Vec<Value>> {
        match value {
            Value::String(_) => Some(vec![value.clone()]),
            Value::Array(items) => Some(items.clone()),
            _ => None,
        }
    };
    let list1 = as_list(value1)?;
    let list2 = as_list(value2)?;
    let common: Vec<Value> = list1.into_iter().filter(|t| list2.contains(t)).collect();
    if common.len() == 1 && (value1.is_string() || value2.is_string()) {
        return common.into_iter().next();
    }
    Some(Value::Array(common))
}

/// Digits after the decimal point in the shortest representation of `n`
fn decimal_places(n: f64) -> u32 {
    let text = n.abs().to_string();
    text.split_once('.').map_or(0, |(_, fraction)| fraction.len() as u32)
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Least common multiple of two `multipleOf` values. Fractions are scaled
/// to integers first so `0.1` and `0.25` combine to exactly `0.5`.
fn lcm(x: f64, y: f64) -> f64 {
    let places = decimal_places(x).max(decimal_places(y)).min(15);
    let scale = 10f64.powi(places as i32);
    let (a, b) = ((x.abs() * scale).round(), (y.abs() * scale).round());
    if a == 0.0 || b == 0.0 || a >= u64::MAX as f64 || b >= u64::MAX as f64 {
        return 0.0;
    }
    let (a, b) = (a as u128, b as u128);
    match (a / gcd(a, b)).checked_mul(b) {
        Some(multiple) => multiple as f64 / scale,
        None => 0.0,
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Merge any number of schemas. Sub-schema maps (`properties` and friends)
/// and object `items` are merged entry by entry before the remaining
/// keywords go through [`combine_schemas`].
pub fn merge_schemas(schemas: &[Value]) -> Value {
    schemas
        .iter()
        .fold(Value::Object(Map::new()), |merged, schema| merge_pair(&merged, schema))
}

fn merge_pair(a: &Value, b: &Value) -> Value {
    let (Some(first), Some(second)) = (a.as_object(), b.as_object()) else {
        return combine_schemas(a, b);
    };
    let mut first = first.clone();
    let mut second = second.clone();

    for key in ["properties", "patternProperties", "definitions"] {
        if let (Some(Value::Object(map1)), Some(Value::Object(map2))) =
            (first.get(key), second.get(key))
        {
            let mut merged = map1.clone();
            for (name, schema2) in map2 {
                let entry = match map1.get(name) {
                    Some(schema1) => merge_pair(schema1, schema2),
                    None => schema2.clone(),
                };
                merged.insert(name.clone(), entry);
            }
            first.insert(key.to_string(), Value::Object(merged));
            second.remove(key);
        }
    }
    if let (Some(items1 @ Value::Object(_)), Some(items2 @ Value::Object(_))) =
        (first.get("items"), second.get("items"))
    {
        let merged = merge_pair(items1, items2);
        first.insert("items".to_string(), merged);
        second.remove("items");
    }

    combine_schemas(&Value::Object(first), &Value::Object(second))
}

/// Collapse an `allOf` list (plus any sibling keywords) into one schema
pub fn combine_all_of(schema: Value) -> Value {
    let Some(Value::Array(all_of)) = schema.get("allOf") else {
        return schema;
    };
    let mut merged = merge_schemas(all_of);
    if let Value::Object(map) = &schema {
        if map.len() > 1 {
            let mut extra = map.clone();
            extra.remove("allOf");
            merged = merge_schemas(&[merged, Value::Object(extra)]);
        }
    }
    merged
}

/// Move a `required` list misplaced on an array schema into the item schema
/// that declares those properties
pub fn fix_required_array_properties(schema: Value) -> Value {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return schema;
    };
    if schema.get("type").and_then(Value::as_str) != Some("array") {
        return schema;
    }
    let items_key = ["items", "additionalItems"]
        .into_iter()
        .find(|key| {
            schema
                .get(*key)
                .and_then(|items| items.get("properties"))
                .is_some()
        });
    let Some(items_key) = items_key else {
        return schema;
    };
    let items = &schema[items_key];
    let fits = items.get("required").is_none()
        && (items.get("additionalProperties").is_some()
            || required.iter().all(|key| {
                key.as_str()
                    .map(|k| items["properties"].get(k).is_some())
                    .unwrap_or(false)
            }));
    if !fits {
        return schema;
    }

    let mut fixed = schema.clone();
    if let Value::Object(map) = &mut fixed {
        if let Some(required) = map.remove("required") {
            if let Some(Value::Object(items)) = map.get_mut(items_key) {
                items.insert("required".to_string(), required);
            }
        }
    }
    fixed
}
