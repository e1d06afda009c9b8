//! Layout node option merging and `oneOf` title maps

use serde_json::{Map, Value};

use super::schema_type;
use crate::layout::title_map::TitleMapItem;
use crate::pointer;

/// Schema keywords that describe structure rather than control options
pub(crate) const STRUCTURAL_KEYWORDS: &[&str] = &[
    "additionalProperties",
    "additionalItems",
    "properties",
    "items",
    "required",
    "type",
    "x-schema-form",
    "$ref",
];

/// `x-schema-form` keys merged separately or not at all
const FORM_ANNOTATION_SKIPPED: &[&str] = &["items", "options"];

/// Option keys whose `source` feeds a typeahead, first match wins
const TYPEAHEAD_SOURCES: &[(&str, &str)] = &[
    ("/autocomplete/source", "/autocomplete"),
    ("/tagsinput/source", "/tagsinput"),
    ("/tagsinput/typeahead/source", "/tagsinput/typeahead"),
];

/// Merge option sources into a node's options.
///
/// Sources are applied lowest priority first; options already present on
/// the node win over everything.
pub fn update_input_options(
    node_options: &mut Map<String, Value>,
    schema: &Value,
    form_defaults: &Map<String, Value>,
) {
    let mut merged = Map::new();
    merge_filtered(&mut merged, Some(form_defaults), &[]);
    merge_filtered(&mut merged, object_at(schema, "/ui:widget/options"), &[]);
    merge_filtered(&mut merged, object_at(schema, "/ui:widget"), &[]);
    merge_filtered(&mut merged, schema.as_object(), STRUCTURAL_KEYWORDS);
    merge_filtered(&mut merged, object_at(schema, "/x-schema-form/options"), &[]);
    merge_filtered(&mut merged, object_at(schema, "/x-schema-form"), FORM_ANNOTATION_SKIPPED);
    let existing = std::mem::take(node_options);
    merge_filtered(&mut merged, Some(&existing), &[]);
    *node_options = merged;

    if !node_options.contains_key("titleMap") {
        derive_title_map(node_options, schema);
    }

    if schema_type(schema).as_deref() == Some("integer")
        && node_options.get("multipleOf").map_or(true, Value::is_null)
    {
        node_options.insert("multipleOf".to_string(), Value::from(1));
    }

    let options = Value::Object(node_options.clone());
    let typeahead = TYPEAHEAD_SOURCES
        .iter()
        .find(|(source, _)| pointer::get(&options, source).is_some())
        .and_then(|(_, owner)| pointer::get(&options, owner));
    if let Some(typeahead) = typeahead {
        node_options.insert("typeahead".to_string(), typeahead.clone());
    }
}

fn object_at<'a>(schema: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
    pointer::get(schema, path).and_then(Value::as_object)
}

fn merge_filtered(target: &mut Map<String, Value>, source: Option<&Map<String, Value>>, skip: &[&str]) {
    let Some(source) = source else {
        return;
    };
    for (key, value) in source {
        if value.is_null() || skip.contains(&key.as_str()) {
            continue;
        }
        target.insert(strip_ui_prefix(key).to_string(), value.clone());
    }
}

fn strip_ui_prefix(key: &str) -> &str {
    match key.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("ui:") => &key[3..],
        _ => key,
    }
}

fn derive_title_map(options: &mut Map<String, Value>, schema: &Value) {
    let flat_list = options.get("flatList").and_then(Value::as_bool);
    if let Some(title_map) = get_title_map_from_oneof(schema, flat_list) {
        options.insert("titleMap".to_string(), title_map_value(title_map));
        return;
    }
    if options.contains_key("enum") {
        if let Some(names) = options.get("enumNames").cloned() {
            options.insert("titleMap".to_string(), names);
        }
        return;
    }
    let Some(items) = schema.get("items").filter(|i| i.is_object()) else {
        return;
    };
    if let Some(title_map) = items.get("titleMap") {
        options.insert("titleMap".to_string(), title_map.clone());
    } else if let Some(values) = items.get("enum") {
        options.insert("enum".to_string(), values.clone());
        let names = options
            .get("enumNames")
            .or_else(|| items.get("enumNames"))
            .cloned();
        if let Some(names) = names {
            options.insert("titleMap".to_string(), names);
        }
    } else if let Some(title_map) = get_title_map_from_oneof(items, flat_list) {
        options.insert("titleMap".to_string(), title_map_value(title_map));
    }
}

fn title_map_value(items: Vec<TitleMapItem>) -> Value {
    serde_json::to_value(items).unwrap_or(Value::Null)
}

// ============================================================================
// oneOf Title Maps
// ============================================================================

/// Read `{title, enum: [v]}` or `{title, const: v}` branches as options
fn one_of_items(schema: &Value) -> Option<Vec<TitleMapItem>> {
    let branches = schema.get("oneOf")?.as_array()?;
    if branches.is_empty() {
        return None;
    }
    let titles: Vec<&str> = branches
        .iter()
        .map(|b| b.get("title").and_then(Value::as_str).filter(|t| !t.is_empty()))
        .collect::<Option<_>>()?;

    let single_enum = |branch: &Value| match branch.get("enum") {
        Some(Value::Array(values)) if values.len() == 1 => values.first().cloned(),
        _ => None,
    };
    let constant = |branch: &Value| branch.get("const").filter(|v| !v.is_null()).cloned();

    let values: Vec<Value> = branches
        .iter()
        .map(single_enum)
        .collect::<Option<_>>()
        .or_else(|| branches.iter().map(constant).collect::<Option<_>>())?;

    Some(
        titles
            .into_iter()
            .zip(values)
            .map(|(title, value)| TitleMapItem::new(title, value))
            .collect(),
    )
}

/// Whether every `oneOf` branch can be shown as a labelled option
pub fn has_title_map_in_oneof(schema: &Value) -> bool {
    one_of_items(schema).is_some()
}

/// Build a title map from a schema's `oneOf` branches.
///
/// With `flat_list` not explicitly `false`, titles such as `Fruit: Apple`
/// are split into a group and a name when more than one title uses the
/// separator. The split version is kept when `flat_list` is `true` or two
/// neighbouring entries share a group.
pub fn get_title_map_from_oneof(schema: &Value, flat_list: Option<bool>) -> Option<Vec<TitleMapItem>> {
    let items = one_of_items(schema)?;
    if flat_list == Some(false) || items.iter().filter(|i| i.name.contains(": ")).count() <= 1 {
        return Some(items);
    }

    let grouped: Vec<TitleMapItem> = items
        .iter()
        .map(|item| match item.name.split_once(": ") {
            Some((group, name)) if !group.is_empty() && !name.is_empty() => TitleMapItem {
                name: name.to_string(),
                value: item.value.clone(),
                group: Some(group.to_string()),
            },
            _ => item.clone(),
        })
        .collect();
    let neighbours_share_group = grouped
        .windows(2)
        .any(|pair| pair[1].group.is_some() && pair[0].group == pair[1].group);

    if flat_list == Some(true) || neighbours_share_group {
        Some(grouped)
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options_for(schema: Value, existing: Value, defaults: Value) -> Map<String, Value> {
        let mut options = existing.as_object().cloned().unwrap_or_default();
        let defaults = defaults.as_object().cloned().unwrap_or_default();
        update_input_options(&mut options, &schema, &defaults);
        options
    }

    #[test]
    fn test_merge_priority() {
        let schema = json!({
            "type": "string",
            "title": "From schema",
            "maxLength": 10,
            "x-schema-form": { "placeholder": "annotation", "options": { "placeholder": "inner" } }
        });
        let options = options_for(
            schema,
            json!({ "title": "From layout" }),
            json!({ "placeholder": "default", "feedback": true }),
        );
        assert_eq!(options["title"], "From layout");
        assert_eq!(options["placeholder"], "annotation");
        assert_eq!(options["feedback"], true);
        assert_eq!(options["maxLength"], 10);
        assert!(!options.contains_key("type"));
        assert!(!options.contains_key("x-schema-form"));
    }

    #[test]
    fn test_nulls_skipped_and_ui_prefix_stripped() {
        let schema = json!({
            "type": "string",
            "description": null,
            "UI:help": "Some help",
            "ui:widget": { "rows": 4, "options": { "rows": 2, "cols": 8 } }
        });
        let options = options_for(schema, json!({}), json!({ "description": "kept" }));
        assert_eq!(options["description"], "kept");
        assert_eq!(options["help"], "Some help");
        assert_eq!(options["rows"], 4);
        assert_eq!(options["cols"], 8);
    }

    #[test]
    fn test_integer_gets_step() {
        let options = options_for(json!({ "type": "integer" }), json!({}), json!({}));
        assert_eq!(options["multipleOf"], 1);
        let options = options_for(json!({ "type": "integer", "multipleOf": 5 }), json!({}), json!({}));
        assert_eq!(options["multipleOf"], 5);
    }

    #[test]
    fn test_typeahead_copied_from_tagsinput() {
        let schema = json!({ "type": "string", "tagsinput": { "source": ["a", "b"] } });
        let options = options_for(schema, json!({}), json!({}));
        assert_eq!(options["typeahead"], json!({ "source": ["a", "b"] }));
    }

    #[test]
    fn test_title_map_from_items_enum() {
        let schema = json!({
            "type": "array",
            "items": { "type": "string", "enum": ["r", "g"], "enumNames": ["Red", "Green"] }
        });
        let options = options_for(schema, json!({}), json!({}));
        assert_eq!(options["enum"], json!(["r", "g"]));
        assert_eq!(options["titleMap"], json!(["Red", "Green"]));
    }

    #[test]
    fn test_title_map_from_oneof() {
        let schema = json!({
            "type": "string",
            "oneOf": [
                { "title": "Small", "enum": ["s"] },
                { "title": "Large", "enum": ["l"] }
            ]
        });
        let options = options_for(schema, json!({}), json!({}));
        assert_eq!(
            options["titleMap"],
            json!([{ "name": "Small", "value": "s" }, { "name": "Large", "value": "l" }])
        );
    }

    #[test]
    fn test_oneof_requires_titles_and_values() {
        assert!(!has_title_map_in_oneof(&json!({ "oneOf": [{ "const": "a" }] })));
        assert!(!has_title_map_in_oneof(&json!({ "oneOf": [{ "title": "A", "enum": ["a", "b"] }] })));
        assert!(has_title_map_in_oneof(&json!({ "oneOf": [{ "title": "A", "const": 0 }] })));
        assert!(!has_title_map_in_oneof(&json!({ "type": "string" })));
    }

    #[test]
    fn test_oneof_groups() {
        let schema = json!({
            "oneOf": [
                { "title": "Fruit: Apple", "const": "apple" },
                { "title": "Fruit: Pear", "const": "pear" },
                { "title": "Veg: Leek", "const": "leek" }
            ]
        });
        let grouped = get_title_map_from_oneof(&schema, None).unwrap();
        assert_eq!(grouped[0].group.as_deref(), Some("Fruit"));
        assert_eq!(grouped[0].name, "Apple");
        assert_eq!(grouped[2].group.as_deref(), Some("Veg"));

        let flat = get_title_map_from_oneof(&schema, Some(false)).unwrap();
        assert_eq!(flat[0].name, "Fruit: Apple");
        assert!(flat[0].group.is_none());
    }
}
