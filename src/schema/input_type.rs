//! Control type inference

use serde_json::{Map, Value};

use super::options::has_title_map_in_oneof;
use super::schema_type;
use crate::pointer;

/// Schema locations that name a control type explicitly, highest priority
/// first. `x-schema-form` follows Angular Schema Form, `widget` follows
/// React JSON Schema Form.
const CONTROL_TYPE_POINTERS: &[&str] = &[
    "/x-schema-form/type",
    "/x-schema-form/widget/component",
    "/x-schema-form/widget",
    "/widget/component",
    "/widget",
];

/// Schema locations that may carry an `inline` flag, after the node's own
const INLINE_POINTERS: &[&str] = &[
    "/inline",
    "/x-schema-form/inline",
    "/x-schema-form/options/inline",
    "/x-schema-form/widget/inline",
    "/x-schema-form/widget/component/inline",
    "/x-schema-form/widget/component/options/inline",
    "/widget/inline",
    "/widget/component/inline",
    "/widget/component/options/inline",
];

/// Pick a control type for a schema.
///
/// `node_options` are the options already present on the layout node; a
/// `titleMap` there turns a plain field into a `select`.
pub fn get_input_type(schema: &Value, node_options: Option<&Map<String, Value>>) -> Option<String> {
    let explicit = CONTROL_TYPE_POINTERS
        .iter()
        .find_map(|p| pointer::get(schema, p).and_then(Value::as_str));
    if let Some(control_type) = explicit {
        return Some(check_inline_type(control_type, schema, node_options));
    }

    let Some(ty) = schema_type(schema) else {
        return Some(if schema.get("$ref").is_some() { "$ref" } else { "text" }.to_string());
    };

    let inferred = match ty.as_str() {
        "boolean" => "checkbox",
        "object" => {
            if schema.get("properties").is_some() {
                "section"
            } else if schema.get("$ref").is_some()
                || pointer::get(schema, "/additionalProperties/$ref").is_some()
            {
                "$ref"
            } else {
                return None;
            }
        }
        "array" => {
            let items = schema
                .get("items")
                .filter(|v| !v.is_null())
                .or_else(|| schema.get("additionalItems"));
            let has_enum = items.and_then(|i| i.get("enum")).is_some();
            let single = schema.get("maxItems").and_then(Value::as_f64) == Some(1.0);
            if has_enum && !single {
                return Some(check_inline_type("checkboxes", schema, node_options));
            }
            "array"
        }
        "null" => "hidden",
        _ if schema.get("enum").is_some()
            || node_options.map_or(false, |o| o.contains_key("titleMap"))
            || has_title_map_in_oneof(schema) =>
        {
            "select"
        }
        "number" | "integer" => {
            let stepped = ty == "integer" || schema.get("multipleOf").is_some();
            if stepped && schema.get("maximum").is_some() && schema.get("minimum").is_some() {
                "range"
            } else {
                ty.as_str()
            }
        }
        "string" => match schema.get("format").and_then(Value::as_str) {
            Some("color") => "color",
            Some("date") => "date",
            Some("date-time") => "datetime-local",
            Some("email") => "email",
            Some("uri") => "url",
            _ => "text",
        },
        _ => {
            if schema.get("$ref").is_some() {
                "$ref"
            } else {
                "text"
            }
        }
    };
    Some(inferred.to_string())
}

/// Turn `checkboxes`/`radios` into their `-inline` variants when an
/// `inline: true` flag is found on the node or schema
pub fn check_inline_type(
    control_type: &str,
    schema: &Value,
    node_options: Option<&Map<String, Value>>,
) -> String {
    if !control_type.starts_with("checkbox") && !control_type.starts_with("radio") {
        return control_type.to_string();
    }
    let from_node = node_options
        .and_then(|o| o.get("inline"))
        .filter(|v| !v.is_null());
    let inline = from_node.or_else(|| {
        INLINE_POINTERS
            .iter()
            .find_map(|p| pointer::get(schema, p).filter(|v| !v.is_null()))
    });
    if inline == Some(&Value::Bool(true)) {
        if control_type.starts_with("radio") {
            "radios-inline".to_string()
        } else {
            "checkboxes-inline".to_string()
        }
    } else {
        control_type.to_string()
    }
}
