//! Template-driven layout compilation

use serde_json::{json, Map, Value};
use tracing::error;

use super::context::FormContext;
use super::from_schema::{add_item_node, build_layout_from_schema, expand_bound_node};
use super::node::{
    add_button_label, fix_title, is_index, to_generic_layout_pointer, ArrayBounds, ArrayItemType,
    LayoutNode,
};
use super::ref_library::{LayoutTemplate, ReferenceSite};
use super::title_map::build_title_map;
use super::walker::{map_layout, map_nodes, Mapped};
use crate::pointer::{self, WILDCARD};
use crate::schema::{
    check_inline_type, get_control_validators, get_input_type, get_parent_from_schema,
    is_input_required, schema_type, to_schema_pointer, update_input_options,
};

/// Object keys that describe the node itself; every other key is an option
const NODE_FIELDS: &[&str] = &[
    "_id",
    "$ref",
    "arrayItem",
    "arrayItemType",
    "dataPointer",
    "dataType",
    "items",
    "tabs",
    "key",
    "layoutPointer",
    "name",
    "options",
    "recursiveReference",
    "type",
    "widget",
];

/// Controls that present a title map
const SELECT_TYPES: &[&str] = &[
    "select",
    "radios",
    "radios-inline",
    "radiobuttons",
    "checkboxes",
    "checkboxes-inline",
    "checkboxbuttons",
];

const TAB_CONTAINERS: &[&str] = &["tabs", "tabarray"];

/// Compile a layout template into layout nodes.
///
/// Entries are strings (dotted keys, JSON pointers or `*` for "everything
/// in the schema") or objects carrying their own type, options and items.
/// A submit control is appended unless the layout has one at the top level
/// or the form options turn it off.
pub fn build_layout(ctx: &mut FormContext, layout: Vec<Value>) -> Vec<LayoutNode> {
    let mut nodes = map_layout(layout, "", &mut |item: Value, children, _index, pointer: &str| {
        build_template_node(ctx, item, children, pointer)
    });

    for node in nodes.iter_mut().filter(|n| n.node_type.is_empty()) {
        set_type(ctx, node, "section");
    }

    if ctx.options.add_submit && !nodes.iter().any(|node| node.node_type == "submit") {
        nodes.push(LayoutNode {
            id: Some(ctx.ids.next_id()),
            node_type: "submit".to_string(),
            layout_pointer: format!("/{}", WILDCARD),
            options: Map::from_iter([("title".to_string(), json!("Submit"))]),
            widget: ctx.widget("submit"),
            ..Default::default()
        });
    }

    attach_title_maps(ctx, &mut nodes);
    nodes
}

fn set_type(ctx: &FormContext, node: &mut LayoutNode, node_type: &str) {
    node.node_type = node_type.to_string();
    node.widget = ctx.widget(node_type);
}

// ============================================================================
// Entry Parsing
// ============================================================================

/// Turn one raw layout entry (children already compiled) into a node
fn build_template_node(
    ctx: &mut FormContext,
    item: Value,
    children: Option<Vec<LayoutNode>>,
    pointer: &str,
) -> Mapped<LayoutNode> {
    let mut node = LayoutNode::new(Some(ctx.ids.next_id()), to_generic_layout_pointer(pointer));
    let mut key = None;

    match item {
        Value::Object(entry) => apply_entry_fields(&mut node, &mut key, entry),
        Value::String(text) if !text.is_empty() && pointer::is_pointer(&text) => {
            node.data_pointer = Some(text);
        }
        Value::String(text) => key = Some(text),
        other => {
            error!("Form layout element not recognized: {}", other);
            return Mapped::Drop;
        }
    }
    let is_container = children.is_some();
    node.items = children.unwrap_or_default();

    if node.data_pointer.is_none() {
        if let Some(key) = key {
            node.data_pointer = Some(if key == "*" {
                key
            } else {
                pointer::compile_with_default(&pointer::parse_object_path(&key), WILDCARD)
            });
        } else if node.node_type.ends_with("array") {
            node.data_pointer = find_item_data_pointer(&node.items).and_then(|child| {
                let end = child.rfind(&format!("/{}", WILDCARD))?;
                Some(child[..end].to_string())
            });
        }
    }

    match node.data_pointer.as_deref() {
        Some("*") => {
            let layout_pointer = node
                .layout_pointer
                .strip_suffix(&format!("/{}", WILDCARD))
                .unwrap_or(&node.layout_pointer)
                .to_string();
            return build_layout_from_schema(ctx, &layout_pointer);
        }
        Some(_) => bind_data_node(ctx, &mut node, is_container),
        None if !node.node_type.is_empty() || is_container => {
            update_input_options(&mut node.options, &json!({}), &ctx.options.form_defaults);
            if !node.node_type.is_empty() {
                node.widget = ctx.widget(&node.node_type);
            }
            type_child_containers(ctx, &mut node);
        }
        None => {}
    }
    if node.title().is_none() {
        if let Some(name) = node.name.as_deref().filter(|n| !is_index(n)) {
            let title = fix_title(name);
            node.options.insert("title".to_string(), json!(title));
        }
    }
    Mapped::One(node)
}

/// Split an object entry into node fields and options
fn apply_entry_fields(node: &mut LayoutNode, key: &mut Option<String>, entry: Map<String, Value>) {
    let mut extra = Map::new();
    let mut widget_name = None;

    for (field, value) in entry {
        match field.as_str() {
            "type" => node.node_type = value.as_str().unwrap_or_default().to_string(),
            "widget" => widget_name = value.as_str().map(str::to_string),
            "name" => node.name = value.as_str().map(str::to_string),
            "dataPointer" => node.data_pointer = value.as_str().map(str::to_string),
            "key" => *key = value.as_str().map(str::to_string),
            "options" => {
                if let Value::Object(options) = value {
                    node.options.extend(options.into_iter().filter(|(_, v)| !v.is_null()));
                }
            }
            _ if NODE_FIELDS.contains(&field.as_str()) => {}
            _ => {
                extra.insert(field, value);
            }
        }
    }
    node.options.extend(extra);

    if node.node_type.is_empty() {
        if let Some(widget_name) = widget_name {
            node.node_type = widget_name;
        }
    }
    if !node.options.contains_key("title") {
        if let Some(legend) = node.options.remove("legend") {
            node.options.insert("title".to_string(), legend);
        }
    }
}

/// First list-position data pointer among a node's descendants
fn find_item_data_pointer(items: &[LayoutNode]) -> Option<String> {
    items.iter().find_map(|item| {
        item.data_pointer
            .clone()
            .filter(|dp| dp.contains(&format!("/{}", WILDCARD)))
            .or_else(|| find_item_data_pointer(&item.items))
    })
}

/// Give untyped child containers a type and mark the children of arrays
fn type_child_containers(ctx: &FormContext, node: &mut LayoutNode) {
    let default_type = if TAB_CONTAINERS.contains(&node.node_type.as_str()) {
        "tab"
    } else {
        "section"
    };
    let in_array = node.node_type == "array";
    for child in &mut node.items {
        if child.node_type.is_empty() {
            set_type(ctx, child, default_type);
        }
        if child.data_pointer.is_none() && in_array {
            child.array_item = true;
        }
    }
}

// ============================================================================
// Data-Bound Nodes
// ============================================================================

fn bind_data_node(ctx: &mut FormContext, node: &mut LayoutNode, has_children: bool) {
    let raw_pointer = node.data_pointer.clone().unwrap_or_default();
    let data_len = ctx.data_len(&raw_pointer);
    let data_pointer = ctx.generic_pointer(&raw_pointer);
    node.data_pointer = Some(data_pointer.clone());

    if node.name.is_none() {
        node.name = pointer::to_key(&data_pointer).filter(|k| k != WILDCARD);
    }

    let ref_pointer = ctx.data_ref_pointer(&data_pointer);
    let cached = ctx
        .data_map
        .get(&ref_pointer)
        .and_then(|entry| entry.schema_pointer.clone());
    let schema_pointer = match cached {
        Some(schema_pointer) => Some(schema_pointer),
        None => {
            let schema_pointer = to_schema_pointer(&ref_pointer, ctx.schema());
            ctx.data_entry(&ref_pointer).schema_pointer = schema_pointer.clone();
            schema_pointer
        }
    };
    let disabled = node.option_flag("disabled", false);
    ctx.data_entry(&ref_pointer).disabled = disabled;

    let node_schema = schema_pointer
        .as_deref()
        .and_then(|sp| ctx.resolved.schema_at(sp))
        .cloned();
    let mut bounds = None;

    match (&node_schema, schema_pointer.as_deref()) {
        (Some(schema), Some(schema_pointer)) => {
            let inferred = get_input_type(schema, Some(&node.options)).unwrap_or_else(|| "none".to_string());
            if node.node_type.is_empty() {
                node.node_type = inferred;
            } else if !ctx.registry.has_widget(&node.node_type) {
                error!(
                    "Widget type \"{}\" not found in library, replacing with \"{}\"",
                    node.node_type, inferred
                );
                node.node_type = inferred;
            } else {
                node.node_type = check_inline_type(&node.node_type, schema, Some(&node.options));
            }
            node.data_type = schema_type(schema).or_else(|| schema.get("$ref").map(|_| "$ref".to_string()));
            update_input_options(&mut node.options, schema, &ctx.options.form_defaults);

            if node.node_type == "checkboxes" && schema.get("items").is_some() {
                update_input_options(&mut node.options, &schema["items"], &ctx.options.form_defaults);
            } else if node.data_type.as_deref() == Some("array") {
                let array_bounds =
                    ArrayBounds::new(schema, &node.options, ctx.options.max_items_cap, false);
                array_bounds.write_options(&mut node.options);
                let entry = ctx.data_entry(&ref_pointer);
                if entry.max_items.is_none() {
                    entry.max_items = Some(array_bounds.max_items);
                    entry.min_items = Some(array_bounds.min_items);
                    entry.tuple_items = Some(array_bounds.tuple_items);
                    entry.list_items = Some(array_bounds.list_items);
                }
                bounds = Some(array_bounds);
            }
            if is_input_required(ctx.schema(), schema_pointer) {
                node.options.insert("required".to_string(), Value::Bool(true));
                ctx.fields_required = true;
            }
            ctx.data_entry(&ref_pointer).validators = get_control_validators(schema);
        }
        _ => {
            update_input_options(&mut node.options, &json!({}), &ctx.options.form_defaults);
            if node.node_type.is_empty() {
                node.node_type = get_input_type(&json!({}), Some(&node.options)).unwrap_or_default();
            }
        }
    }

    normalize_copy_value_to(&mut node.options);
    node.widget = ctx.widget(&node.node_type);
    ctx.data_entry(&ref_pointer).input_type = Some(node.node_type.clone());
    type_child_containers(ctx, node);

    if !has_children {
        // A bare key to a structural schema lays its children out from the schema
        if let Some(schema_pointer) = schema_pointer.as_deref() {
            expand_bound_node(ctx, node, schema_pointer);
        }
        return;
    }
    if let Some(bounds) = bounds.filter(|_| !node.items.is_empty()) {
        expand_array(ctx, node, &bounds, data_len);
    }
}

/// `copyValueTo` accepts one dotted key or a list; store generic pointers
fn normalize_copy_value_to(options: &mut Map<String, Value>) {
    let targets = match options.get("copyValueTo") {
        Some(Value::String(key)) => vec![key.clone()],
        Some(Value::Array(keys)) => keys.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => return,
    };
    let pointers: Vec<Value> = targets
        .iter()
        .map(|key| json!(pointer::compile_with_default(&pointer::parse_object_path(key), WILDCARD)))
        .collect();
    options.insert("copyValueTo".to_string(), Value::Array(pointers));
}

// ============================================================================
// Array Expansion
// ============================================================================

/// Mark array items, regroup loose item fields, stock the ref library and
/// lay out the initial item count plus the "add" control
fn expand_array(ctx: &mut FormContext, node: &mut LayoutNode, bounds: &ArrayBounds, data_len: usize) {
    let data_pointer = node.data_pointer.clone().unwrap_or_default();
    let item_data = format!("{}/{}", data_pointer, WILDCARD);
    let item_layout = format!("{}/items/{}", node.layout_pointer, WILDCARD);
    let array_ref_pointer = ctx.data_ref_pointer(&item_data);
    ctx.data_entry(&array_ref_pointer).input_type = Some("section".to_string());
    let removable = node.option_flag("removable", true);

    if node.items.len() > 1 {
        regroup_array_items(ctx, node, &array_ref_pointer, removable, bounds);
    } else if let Some(first) = node.items.first_mut() {
        first.array_item = true;
        if first.data_pointer.is_none() {
            first.data_pointer = Some(ctx.generic_pointer(&array_ref_pointer));
        }
        if !first.options.contains_key("removable") {
            first.options.insert("removable".to_string(), json!(true));
        }
        if node.options.get("orderable") == Some(&Value::Bool(false)) {
            first.options.insert("orderable".to_string(), json!(false));
        }
        first.array_item_type = Some(if bounds.tuple_items > 0 {
            ArrayItemType::Tuple
        } else {
            ArrayItemType::List
        });
    }

    let addable = node.option_flag("addable", true);
    let item_pointer = ctx.generic_pointer(&array_ref_pointer);
    let ref_pointer = ctx.data_ref_pointer(&item_pointer);
    let relative = ref_pointer != item_data;
    let layout_template = node.items.last().map(|last| {
        let mut template = last.clone();
        template.recursive_reference = relative;
        if relative {
            let layout_base = format!("{}/items", node.layout_pointer);
            template.visit_mut(&mut |n| {
                if let Some(dp) = &n.data_pointer {
                    if pointer::is_sub_pointer(&item_data, dp) {
                        n.data_pointer = Some(dp[item_data.len()..].to_string());
                    }
                }
                if let Some(rest) = n.layout_pointer.strip_prefix(&layout_base) {
                    n.layout_pointer = rest.to_string();
                }
            });
        }
        LayoutTemplate::new(template, relative)
    });
    if addable && !ctx.layout_refs.contains(&ref_pointer) {
        if let Some(template) = &layout_template {
            ctx.layout_refs.insert_template(&ref_pointer, template.clone());
        }
    }

    // `addable` gates the cached template and the add control, never the count
    let count = bounds.instance_count(data_len);
    let site = ReferenceSite {
        ref_pointer: &ref_pointer,
        data_pointer: &item_data,
        layout_pointer: &item_layout,
    };
    let Some(template) = ctx.layout_refs.get(&ref_pointer).cloned().or(layout_template) else {
        return;
    };
    while node.items.len() < count {
        match template.instantiate(&site, &mut ctx.ids) {
            Some(item) => node.items.push(item),
            None => break,
        }
    }

    if !addable || node.items.len() >= bounds.max_items {
        return;
    }
    let parent_title = get_parent_from_schema(ctx.schema(), &data_pointer)
        .and_then(|parent| parent.get("title").and_then(Value::as_str).map(str::to_string));
    let segment = pointer::parse(&data_pointer).and_then(|segments| {
        segments
            .len()
            .checked_sub(2)
            .and_then(|i| segments.get(i).cloned())
    });
    let label = add_button_label(
        node.title(),
        node.name.as_deref(),
        parent_title.as_deref(),
        segment.as_deref(),
    );
    let add = add_item_node(ctx, node, &ref_pointer, relative, label, bounds);
    node.items.push(add);
}

/// Wrap children bound inside the array item into one section item
fn regroup_array_items(
    ctx: &mut FormContext,
    node: &mut LayoutNode,
    array_ref_pointer: &str,
    removable: bool,
    bounds: &ArrayBounds,
) {
    let data_pointer = node.data_pointer.clone().unwrap_or_default();
    let item_data = format!("{}/{}", data_pointer, WILDCARD);
    let group_layout = format!("{}/items/{}", node.layout_pointer, WILDCARD);
    let array_layout = node.layout_pointer.clone();

    let (grouped, mut kept): (Vec<LayoutNode>, Vec<LayoutNode>) =
        std::mem::take(&mut node.items).into_iter().partition(|child| {
            child
                .data_pointer
                .as_deref()
                .map_or(false, |dp| pointer::is_sub_pointer(array_ref_pointer, dp))
        });

    for child in &mut kept {
        child.array_item = true;
        child.array_item_type = Some(ArrayItemType::List);
        child.options.insert("removable".to_string(), json!(removable));
    }

    if !grouped.is_empty() {
        let grouped = map_nodes(grouped, "", &mut |mut item, _, _| {
            if let Some(dp) = &item.data_pointer {
                if pointer::is_sub_pointer(array_ref_pointer, dp) {
                    item.data_pointer = Some(format!("{}{}", item_data, &dp[array_ref_pointer.len()..]));
                }
            }
            if let Some(rest) = item.layout_pointer.strip_prefix(&array_layout) {
                item.layout_pointer = format!("{}{}", group_layout, rest);
            }
            Mapped::One(item)
        });
        let item_type = if bounds.tuple_items > kept.len() {
            ArrayItemType::Tuple
        } else {
            ArrayItemType::List
        };
        kept.push(LayoutNode {
            id: Some(ctx.ids.next_id()),
            node_type: "section".to_string(),
            data_pointer: Some(item_data.clone()),
            layout_pointer: group_layout.clone(),
            items: grouped,
            options: Map::from_iter([("removable".to_string(), json!(removable))]),
            array_item: true,
            array_item_type: Some(item_type),
            widget: ctx.widget("section"),
            ..Default::default()
        });
    }
    node.items = kept;
}

// ============================================================================
// Title Maps
// ============================================================================

/// Give every selection control its option list, templates included
pub(crate) fn attach_title_maps(ctx: &mut FormContext, nodes: &mut [LayoutNode]) {
    let flat_list = ctx.options.flat_list;
    let mut apply = |node: &mut LayoutNode| {
        if node.title_map.is_some() || !SELECT_TYPES.contains(&node.node_type.as_str()) {
            return;
        }
        let required = node.node_type.starts_with("checkbox") || node.option_flag("required", false);
        let title_map = build_title_map(
            node.options.get("titleMap"),
            node.options.get("enum").and_then(Value::as_array).map(Vec::as_slice),
            required,
            node.option_flag("flatList", flat_list),
        );
        node.title_map = Some(title_map);
    };
    for node in nodes.iter_mut() {
        node.visit_mut(&mut apply);
    }
    ctx.layout_refs
        .for_each_template_mut(|template| template.visit_mut(&mut apply));
}
