use super::builder::build_layout;
use super::context::FormContext;
use super::node::{ArrayItemType, LayoutNode};
use super::title_map::TitleMapEntry;
use crate::config::FormOptions;
use crate::schema::resolve_schema_references;
use crate::widgets::BasicWidgetRegistry;
use serde_json::{json, Value};
use std::sync::Arc;

fn person_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "title": "Full name" },
            "age": { "type": "integer" },
            "color": { "type": "string", "enum": ["red", "green"] }
        },
        "required": ["age"]
    })
}

fn compile(schema: Value, layout: Value, data: Option<Value>) -> (Vec<LayoutNode>, FormContext) {
    let mut ctx = FormContext::new(
        resolve_schema_references(&schema),
        data,
        FormOptions::default(),
        Arc::new(BasicWidgetRegistry::new()),
    );
    let layout = layout.as_array().cloned().unwrap_or_default();
    let nodes = build_layout(&mut ctx, layout);
    (nodes, ctx)
}

#[test]
fn test_keys_and_object_entries() {
    let (nodes, ctx) = compile(
        person_schema(),
        json!(["name", { "key": "age", "placeholder": "0", "options": { "readonly": true } }]),
        None,
    );

    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].data_pointer.as_deref(), Some("/name"));
    assert_eq!(nodes[0].node_type, "text");
    assert_eq!(nodes[0].title(), Some("Full name"));
    assert_eq!(nodes[0].layout_pointer, "/-");

    let age = &nodes[1];
    assert_eq!(age.node_type, "integer");
    assert_eq!(age.title(), Some("Age"));
    assert_eq!(age.options["placeholder"], json!("0"));
    assert_eq!(age.options["readonly"], json!(true));
    assert_eq!(age.options["required"], json!(true));
    assert!(age.widget.is_some());
    assert!(ctx.fields_required);

    let entry = &ctx.data_map["/age"];
    assert_eq!(entry.schema_pointer.as_deref(), Some("/properties/age"));
    assert_eq!(entry.input_type.as_deref(), Some("integer"));

    assert_eq!(nodes[2].node_type, "submit");
    assert_eq!(nodes[2].title(), Some("Submit"));
}

#[test]
fn test_unknown_type_is_replaced_by_inferred_type() {
    let (nodes, _) = compile(person_schema(), json!([{ "key": "name", "type": "fancy-slider" }]), None);
    assert_eq!(nodes[0].node_type, "text");
}

#[test]
fn test_widget_names_the_type() {
    let (nodes, _) = compile(person_schema(), json!([{ "key": "name", "widget": "textarea" }]), None);
    assert_eq!(nodes[0].node_type, "textarea");
}

#[test]
fn test_layout_submit_suppresses_default() {
    let (nodes, _) = compile(
        person_schema(),
        json!(["name", { "type": "submit", "title": "Go" }]),
        None,
    );
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[1].title(), Some("Go"));
    assert!(nodes[1].widget.is_some());
}

#[test]
fn test_wildcard_expands_schema_in_place() {
    let (nodes, _) = compile(
        person_schema(),
        json!([{ "type": "help", "helpvalue": "<p>Hi</p>" }, "*"]),
        None,
    );
    let types: Vec<&str> = nodes.iter().map(|n| n.node_type.as_str()).collect();
    assert_eq!(types, vec!["help", "text", "integer", "select", "submit"]);
    assert_eq!(nodes[0].options["helpvalue"], json!("<p>Hi</p>"));
}

#[test]
fn test_unrecognized_entries_are_dropped() {
    let (nodes, _) = compile(person_schema(), json!([42, "name", null]), None);
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].data_pointer.as_deref(), Some("/name"));
}

#[test]
fn test_tabs_get_tab_children() {
    let (nodes, _) = compile(
        person_schema(),
        json!([{
            "type": "tabs",
            "tabs": [
                { "title": "One", "items": ["name"] },
                { "legend": "Two", "items": ["age"] }
            ]
        }]),
        None,
    );
    let tabs = &nodes[0];
    assert_eq!(tabs.node_type, "tabs");
    assert_eq!(tabs.items.len(), 2);
    assert!(tabs.items.iter().all(|tab| tab.node_type == "tab"));
    assert_eq!(tabs.items[1].title(), Some("Two"));
    assert_eq!(tabs.items[0].items[0].data_pointer.as_deref(), Some("/name"));
    assert_eq!(tabs.items[0].items[0].layout_pointer, "/-/items/-/items/-");
}

#[test]
fn test_untyped_top_level_container_is_a_section() {
    let (nodes, _) = compile(person_schema(), json!([{ "items": ["name", "age"] }]), None);
    assert_eq!(nodes[0].node_type, "section");
    assert_eq!(nodes[0].items.len(), 2);
}

#[test]
fn test_select_gets_title_map() {
    let (nodes, ctx) = compile(person_schema(), json!(["color"]), None);
    let color = &nodes[0];
    assert_eq!(color.node_type, "select");
    let title_map = color.title_map.as_ref().unwrap();
    assert_eq!(title_map.len(), 3);
    match &title_map[0] {
        TitleMapEntry::Item(item) => {
            assert_eq!(item.name, "<none>");
            assert!(item.value.is_null());
        }
        other => panic!("unexpected entry {:?}", other),
    }
    assert_eq!(ctx.data_map["/color"].validators["enum"], json!([["red", "green"]]));
}

#[test]
fn test_copy_value_to_becomes_pointers() {
    let (nodes, _) = compile(
        person_schema(),
        json!([{ "key": "name", "copyValueTo": "alias.first" }]),
        None,
    );
    assert_eq!(nodes[0].options["copyValueTo"], json!(["/alias/first"]));
}

fn friends_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "friends": {
                "type": "array",
                "maxItems": 4,
                "items": {
                    "type": "object",
                    "properties": {
                        "first": { "type": "string" },
                        "last": { "type": "string" }
                    }
                }
            }
        }
    })
}

#[test]
fn test_array_children_are_grouped_into_one_item() {
    let (nodes, ctx) = compile(
        friends_schema(),
        json!([{ "key": "friends", "items": ["friends[].first", "friends[].last"] }]),
        Some(json!({ "friends": [{ "first": "A" }, { "first": "B" }] })),
    );
    let friends = &nodes[0];
    assert_eq!(friends.node_type, "array");
    assert_eq!(friends.items.len(), 3);

    let item = &friends.items[0];
    assert_eq!(item.node_type, "section");
    assert!(item.array_item);
    assert_eq!(item.array_item_type, Some(ArrayItemType::List));
    assert_eq!(item.data_pointer.as_deref(), Some("/friends/-"));
    assert_eq!(item.layout_pointer, "/-/items/-");
    assert_eq!(item.items[1].data_pointer.as_deref(), Some("/friends/-/last"));
    assert_eq!(item.items[1].layout_pointer, "/-/items/-/items/-");
    assert_ne!(friends.items[0].id, friends.items[1].id);

    let add = &friends.items[2];
    assert!(add.is_reference());
    assert_eq!(add.reference.as_deref(), Some("/friends/-"));
    assert_eq!(add.title(), Some("Add Friends"));
    assert!(ctx.layout_refs.get("/friends/-").is_some());
}

#[test]
fn test_array_without_children_gets_schema_item() {
    let schema = json!({
        "type": "object",
        "properties": {
            "tags": { "type": "array", "items": { "type": "string" }, "minItems": 1, "maxItems": 3 }
        }
    });

    let (nodes, _) = compile(schema.clone(), json!(["tags"]), Some(json!({ "tags": ["a", "b"] })));
    let tags = &nodes[0];
    assert_eq!(tags.items.len(), 3);
    assert!(tags.items[..2].iter().all(|item| item.node_type == "text" && item.array_item));
    assert_eq!(tags.items[0].data_pointer.as_deref(), Some("/tags/-"));
    assert!(tags.items[2].is_reference());

    let (nodes, _) = compile(
        schema,
        json!(["tags"]),
        Some(json!({ "tags": ["a", "b", "c", "d"] })),
    );
    assert_eq!(nodes[0].items.len(), 3);
    assert!(nodes[0].items.iter().all(|item| !item.is_reference()));
}

#[test]
fn test_addable_false_has_no_add_control() {
    let (nodes, _) = compile(
        friends_schema(),
        json!([{ "key": "friends", "addable": false, "items": ["friends[].first"] }]),
        None,
    );
    assert!(nodes[0].items.iter().all(|item| !item.is_reference()));
}

#[test]
fn test_addable_false_keeps_minimum_items() {
    let schema = json!({
        "type": "object",
        "properties": {
            "tags": { "type": "array", "items": { "type": "string" }, "minItems": 3, "maxItems": 5 }
        }
    });
    let (nodes, ctx) = compile(
        schema,
        json!([{ "key": "tags", "addable": false, "items": ["tags[]"] }]),
        None,
    );
    let tags = &nodes[0];
    assert_eq!(tags.items.len(), 3);
    assert!(tags.items.iter().all(|item| {
        !item.is_reference() && item.array_item && item.data_pointer.as_deref() == Some("/tags/-")
    }));
    assert_ne!(tags.items[0].id, tags.items[2].id);
    assert!(ctx.layout_refs.get("/tags/-").is_none());
}

#[test]
fn test_bare_key_to_tuple_array_lays_out_positions() {
    let schema = json!({
        "type": "object",
        "properties": {
            "point": {
                "type": "array",
                "items": [{ "type": "number" }, { "type": "string" }],
                "additionalItems": { "type": "boolean" },
                "minItems": 1
            }
        }
    });
    let (nodes, _) = compile(schema, json!(["point"]), None);
    let point = &nodes[0];
    assert_eq!(point.node_type, "array");
    assert_eq!(point.items.len(), 4);

    assert_eq!(point.items[0].node_type, "number");
    assert_eq!(point.items[0].data_pointer.as_deref(), Some("/point/0"));
    assert_eq!(point.items[0].array_item_type, Some(ArrayItemType::Tuple));
    assert_eq!(point.items[1].node_type, "text");
    assert_eq!(point.items[1].data_pointer.as_deref(), Some("/point/1"));
    assert_eq!(point.items[1].array_item_type, Some(ArrayItemType::Tuple));

    assert_eq!(point.items[2].node_type, "checkbox");
    assert_eq!(point.items[2].data_pointer.as_deref(), Some("/point/-"));
    assert_eq!(point.items[2].array_item_type, Some(ArrayItemType::List));
    assert!(point.items[3].is_reference());
}

#[test]
fn test_bare_key_to_object_expands_properties() {
    let schema = json!({
        "type": "object",
        "properties": {
            "address": {
                "type": "object",
                "properties": {
                    "street": { "type": "string" },
                    "zip": { "type": "string" }
                },
                "required": ["zip"]
            }
        }
    });
    let (nodes, ctx) = compile(schema, json!(["address"]), None);
    let address = &nodes[0];
    assert_eq!(address.node_type, "section");
    assert_eq!(address.items.len(), 2);
    assert_eq!(address.items[0].data_pointer.as_deref(), Some("/address/street"));
    assert_eq!(address.items[0].layout_pointer, "/-/items/-");
    assert_eq!(address.items[1].data_pointer.as_deref(), Some("/address/zip"));
    assert_eq!(address.items[1].options["required"], json!(true));
    assert_eq!(
        ctx.data_map["/address/zip"].schema_pointer.as_deref(),
        Some("/properties/address/properties/zip")
    );
}
