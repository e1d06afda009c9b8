//! Schema-driven layout generation

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::context::FormContext;
use super::node::{
    add_button_label, fix_title, is_index, to_generic_layout_pointer, ArrayBounds, ArrayItemType,
    LayoutNode,
};
use super::ref_library::ReferenceSite;
use super::walker::Mapped;
use crate::pointer::{self, WILDCARD};
use crate::schema::{
    get_control_validators, get_input_type, is_input_required, schema_type, update_input_options,
};

/// Where in the schema, data and layout a node is being generated
#[derive(Clone, Debug, Default)]
struct SchemaNodeRequest {
    layout_pointer: String,
    schema_pointer: String,
    data_pointer: String,
    /// Set for array items
    array_item: Option<ArrayItemType>,
    removable: Option<bool>,
    /// Building a template: no ids, no data map entries
    for_ref_library: bool,
    /// Absolute data pointer of a relative template's instantiation site
    data_pointer_prefix: String,
}

impl SchemaNodeRequest {
    fn child(&self, layout_pointer: String, schema_pointer: String, data_pointer: String) -> Self {
        Self {
            layout_pointer,
            schema_pointer,
            data_pointer,
            array_item: None,
            removable: None,
            for_ref_library: self.for_ref_library,
            data_pointer_prefix: self.data_pointer_prefix.clone(),
        }
    }

    fn is_root(&self) -> bool {
        self.data_pointer.is_empty() && !self.for_ref_library
    }
}

/// Generate layout nodes for the whole compiled schema.
///
/// A root object yields one node per property; any other root yields a
/// single node.
pub fn build_layout_from_schema(ctx: &mut FormContext, layout_pointer: &str) -> Mapped<LayoutNode> {
    let request = SchemaNodeRequest {
        layout_pointer: layout_pointer.to_string(),
        ..Default::default()
    };
    build_schema_node(ctx, &request)
}

fn build_schema_node(ctx: &mut FormContext, req: &SchemaNodeRequest) -> Mapped<LayoutNode> {
    let Some(schema) = ctx.resolved.schema_at(&req.schema_pointer).cloned() else {
        warn!("No schema found at {}", req.schema_pointer);
        return Mapped::Drop;
    };
    if ["type", "$ref", "x-schema-form"]
        .iter()
        .all(|key| schema.get(*key).is_none())
    {
        return Mapped::Drop;
    }
    let Some(node_type) = get_input_type(&schema, None) else {
        debug!("No control type for schema at {}", req.schema_pointer);
        return Mapped::Drop;
    };

    let id = (!req.for_ref_library).then(|| ctx.ids.next_id());
    let layout_pointer = match to_generic_layout_pointer(&req.layout_pointer) {
        p if p.is_empty() => format!("/{}", WILDCARD),
        p => p,
    };
    let mut node = LayoutNode::new(id, layout_pointer);
    node.data_pointer = Some(ctx.generic_pointer(&req.data_pointer));
    node.data_type = schema_type(&schema).or_else(|| schema.get("$ref").map(|_| "$ref".to_string()));
    node.widget = ctx.widget(&node_type);
    node.node_type = node_type;
    node.name = pointer::to_key(&req.data_pointer).filter(|key| key != WILDCARD);
    if let Some(item_type) = req.array_item {
        node.array_item = true;
        node.array_item_type = Some(item_type);
        node.options
            .insert("removable".to_string(), Value::Bool(req.removable != Some(false)));
    }

    update_input_options(&mut node.options, &schema, &ctx.options.form_defaults);
    if node.title().is_none() {
        if let Some(name) = node.name.as_deref().filter(|n| !is_index(n)) {
            node.options.insert("title".to_string(), json!(fix_title(name)));
        }
    }

    if !req.data_pointer.is_empty() && !req.for_ref_library {
        let ref_pointer = ctx.data_ref_pointer(node.data_pointer.as_deref().unwrap_or_default());
        let disabled = node.option_flag("disabled", false);
        let entry = ctx.data_entry(&ref_pointer);
        entry.schema_pointer = Some(req.schema_pointer.clone());
        entry.input_type = Some(node.node_type.clone());
        entry.disabled = disabled;
        entry.validators = get_control_validators(&schema);
    }

    match node.data_type.as_deref() {
        Some("object") => {
            let children = build_properties(ctx, req, &schema, &node.layout_pointer);
            if req.is_root() {
                return Mapped::Many(children);
            }
            node.items = children;
        }
        Some("array") if node.node_type.starts_with("checkboxes") => {
            if let Some(items) = schema.get("items").filter(|items| items.is_object()) {
                update_input_options(&mut node.options, items, &ctx.options.form_defaults);
            }
        }
        Some("array") => build_array_items(ctx, req, &schema, &mut node),
        Some("$ref") => build_reference(ctx, req, &mut node),
        _ => {}
    }
    Mapped::One(node)
}

/// Property names in display order. `ui:order` may list `*` to stand for
/// every property it does not name.
fn ordered_property_keys(schema: &Value, properties: &Map<String, Value>) -> Vec<String> {
    let Some(order) = schema.get("ui:order").and_then(Value::as_array) else {
        return properties.keys().cloned().collect();
    };
    let order: Vec<&str> = order.iter().filter_map(Value::as_str).collect();
    let mut keys = Vec::with_capacity(properties.len());
    for entry in &order {
        if *entry == "*" && !properties.contains_key("*") {
            keys.extend(
                properties
                    .keys()
                    .filter(|key| !order.contains(&key.as_str()))
                    .cloned(),
            );
        } else if properties.contains_key(*entry) {
            keys.push(entry.to_string());
        }
    }
    keys
}

fn build_properties(
    ctx: &mut FormContext,
    req: &SchemaNodeRequest,
    schema: &Value,
    layout_pointer: &str,
) -> Vec<LayoutNode> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let child_layout = if req.is_root() {
        format!("/{}", WILDCARD)
    } else {
        format!("{}/items/{}", layout_pointer, WILDCARD)
    };

    let mut children = Vec::with_capacity(properties.len());
    for key in ordered_property_keys(schema, properties) {
        let escaped = pointer::escape(&key);
        let child_req = req.child(
            child_layout.clone(),
            format!("{}/properties/{}", req.schema_pointer, escaped),
            format!("{}/{}", req.data_pointer, escaped),
        );
        let required = is_input_required(schema, &format!("/properties/{}", escaped));
        for mut child in build_schema_node(ctx, &child_req).into_vec() {
            if required {
                child.options.insert("required".to_string(), Value::Bool(true));
                ctx.fields_required = true;
            }
            children.push(child);
        }
    }
    children
}

/// Store a freshly built template, or drop the reservation when nothing
/// was built
fn store_template(ctx: &mut FormContext, ref_pointer: &str, built: Mapped<LayoutNode>, relative: bool) {
    match built.into_vec().pop() {
        Some(mut template) => {
            if relative {
                template.recursive_reference = true;
            }
            ctx.layout_refs.insert(ref_pointer, template, relative);
        }
        None => ctx.layout_refs.remove(ref_pointer),
    }
}

fn build_array_items(ctx: &mut FormContext, req: &SchemaNodeRequest, schema: &Value, node: &mut LayoutNode) {
    let required = is_input_required(ctx.schema(), &req.schema_pointer);
    let bounds = ArrayBounds::new(schema, &node.options, ctx.options.max_items_cap, required);
    bounds.write_options(&mut node.options);
    let removable = node.option_flag("removable", true);

    let data_pointer = &req.data_pointer;
    let ref_pointer = ctx.data_ref_pointer(&format!(
        "{}{}/{}",
        req.data_pointer_prefix, data_pointer, WILDCARD
    ));
    let generic_pointer = ctx.generic_pointer(data_pointer);
    let relative = ref_pointer != format!("{}/{}", generic_pointer, WILDCARD);
    let item_layout = format!("{}/items/{}", node.layout_pointer, WILDCARD);
    let mut schema_ref_pointer = None;

    if let Some(tuple) = schema.get("items").and_then(Value::as_array) {
        for index in 0..bounds.tuple_items.min(tuple.len()) {
            let item_data = format!("{}/{}", data_pointer, index);
            let item_schema = format!("{}/items/{}", req.schema_pointer, index);
            let item = if removable && index >= bounds.min_items {
                let item_ref = format!(
                    "{}{}",
                    ref_pointer.strip_suffix(WILDCARD).unwrap_or(&ref_pointer),
                    index
                );
                if !ctx.layout_refs.contains(&item_ref) {
                    ctx.layout_refs.reserve(&item_ref);
                    let template_req = SchemaNodeRequest {
                        layout_pointer: if relative { String::new() } else { item_layout.clone() },
                        schema_pointer: item_schema,
                        data_pointer: if relative { String::new() } else { item_data.clone() },
                        array_item: Some(ArrayItemType::Tuple),
                        removable: Some(true),
                        for_ref_library: true,
                        data_pointer_prefix: if relative {
                            format!("{}{}", req.data_pointer_prefix, item_data)
                        } else {
                            String::new()
                        },
                    };
                    let built = build_schema_node(ctx, &template_req);
                    store_template(ctx, &item_ref, built, relative);
                }
                let site = ReferenceSite {
                    ref_pointer: &item_ref,
                    data_pointer: &item_data,
                    layout_pointer: &item_layout,
                };
                ctx.layout_refs.instantiate(&site, &mut ctx.ids)
            } else {
                let mut item_req = req.child(item_layout.clone(), item_schema, item_data);
                item_req.array_item = Some(ArrayItemType::Tuple);
                item_req.removable = Some(false);
                build_schema_node(ctx, &item_req).into_vec().pop()
            };
            node.items.extend(item);
        }
        if schema.get("additionalItems").map_or(false, Value::is_object) {
            schema_ref_pointer =
                Some(ctx.schema_ref_pointer(&format!("{}/additionalItems", req.schema_pointer)));
        }
    } else if schema.get("items").map_or(false, Value::is_object) {
        schema_ref_pointer = Some(ctx.schema_ref_pointer(&format!("{}/items", req.schema_pointer)));
    }

    let array_ref_pointer = ref_pointer
        .strip_suffix(&format!("/{}", WILDCARD))
        .unwrap_or(&ref_pointer)
        .to_string();
    let entry = ctx.data_entry(&array_ref_pointer);
    if entry.max_items.is_none() {
        entry.max_items = Some(bounds.max_items);
        entry.min_items = Some(bounds.min_items);
        entry.tuple_items = Some(bounds.tuple_items);
        entry.list_items = Some(bounds.list_items);
    }

    let Some(schema_ref_pointer) = schema_ref_pointer else {
        return;
    };
    if !ctx.layout_refs.contains(&ref_pointer) {
        ctx.layout_refs.reserve(&ref_pointer);
        let template_req = SchemaNodeRequest {
            layout_pointer: if relative { String::new() } else { item_layout.clone() },
            schema_pointer: schema_ref_pointer,
            data_pointer: if relative {
                String::new()
            } else {
                format!("{}/{}", data_pointer, WILDCARD)
            },
            array_item: Some(ArrayItemType::List),
            removable: Some(removable),
            for_ref_library: true,
            data_pointer_prefix: if relative {
                format!("{}{}/{}", req.data_pointer_prefix, data_pointer, WILDCARD)
            } else {
                String::new()
            },
        };
        let built = build_schema_node(ctx, &template_req);
        store_template(ctx, &ref_pointer, built, relative);
    }

    // Templates are shared by every instance, so their own data does not
    // size them
    let data_len = if req.for_ref_library { 0 } else { ctx.data_len(data_pointer) };
    let count = bounds.instance_count(data_len);
    let site_data = format!("{}/{}", data_pointer, WILDCARD);
    let site = ReferenceSite {
        ref_pointer: &ref_pointer,
        data_pointer: &site_data,
        layout_pointer: &item_layout,
    };
    while node.items.len() < count {
        match ctx.layout_refs.instantiate(&site, &mut ctx.ids) {
            Some(item) => node.items.push(item),
            None => break,
        }
    }

    if node.option_flag("addable", true) && node.items.len() < bounds.max_items {
        let template_title = ctx
            .layout_refs
            .get(&ref_pointer)
            .and_then(|t| t.node.title().map(str::to_string));
        let title = template_title.or_else(|| schema.get("title").and_then(Value::as_str).map(str::to_string));
        let name = pointer::to_key(data_pointer);
        let label = add_button_label(title.as_deref(), name.as_deref(), None, None);
        let add = add_item_node(ctx, node, &ref_pointer, relative, label, &bounds);
        node.items.push(add);
    } else if let Some(last) = node.items.last_mut().filter(|item| item.is_reference()) {
        last.options.insert("maxItems".to_string(), json!(bounds.max_items));
        last.options.insert("minItems".to_string(), json!(bounds.min_items));
    }
}

/// The "add" control appended after an array's items
pub(crate) fn add_item_node(
    ctx: &mut FormContext,
    array: &LayoutNode,
    ref_pointer: &str,
    recursive: bool,
    label: String,
    bounds: &ArrayBounds,
) -> LayoutNode {
    let mut options = Map::new();
    options.insert("listItems".to_string(), json!(bounds.list_items));
    options.insert("maxItems".to_string(), json!(bounds.max_items));
    options.insert("minItems".to_string(), json!(bounds.min_items));
    options.insert("removable".to_string(), json!(false));
    options.insert("title".to_string(), json!(label));
    options.insert("tupleItems".to_string(), json!(bounds.tuple_items));

    LayoutNode {
        id: Some(ctx.ids.next_id()),
        node_type: "$ref".to_string(),
        data_pointer: array
            .data_pointer
            .as_ref()
            .map(|dp| format!("{}/{}", dp, WILDCARD)),
        layout_pointer: format!("{}/items/{}", array.layout_pointer, WILDCARD),
        options,
        array_item: true,
        array_item_type: Some(ArrayItemType::List),
        recursive_reference: recursive,
        reference: Some(ref_pointer.to_string()),
        widget: ctx.widget("$ref"),
        ..Default::default()
    }
}

/// Generate the children of a layout-bound node from its schema: object
/// properties, tuple positions and list items, or a deferred reference.
/// The node keeps its own type, options and pointers.
pub(crate) fn expand_bound_node(ctx: &mut FormContext, node: &mut LayoutNode, schema_pointer: &str) {
    let Some(schema) = ctx.resolved.schema_at(schema_pointer).cloned() else {
        return;
    };
    let request = SchemaNodeRequest {
        layout_pointer: node.layout_pointer.clone(),
        schema_pointer: schema_pointer.to_string(),
        data_pointer: node.data_pointer.clone().unwrap_or_default(),
        ..Default::default()
    };
    match node.data_type.as_deref() {
        Some("object") if !request.data_pointer.is_empty() => {
            node.items = build_properties(ctx, &request, &schema, &node.layout_pointer);
        }
        Some("array") if !node.node_type.starts_with("checkboxes") => {
            build_array_items(ctx, &request, &schema, node);
        }
        Some("$ref") => build_reference(ctx, &request, node),
        _ => {}
    }
}

/// A property whose schema is a recursive `$ref` becomes a deferred
/// reference node; its target is built once into the ref library.
fn build_reference(ctx: &mut FormContext, req: &SchemaNodeRequest, node: &mut LayoutNode) {
    let mut parent_pointer = pointer::parent(&req.schema_pointer).unwrap_or_default();
    if pointer::to_key(&parent_pointer).as_deref() == Some("properties") {
        parent_pointer = pointer::parent(&parent_pointer).unwrap_or_default();
    }
    let parent_schema = ctx.resolved.schema_at(&parent_pointer).cloned().unwrap_or(Value::Null);
    let segment = pointer::parse(&req.data_pointer).and_then(|segments| {
        segments
            .len()
            .checked_sub(2)
            .and_then(|i| segments.get(i).cloned())
    });
    let label = add_button_label(
        node.options.get("add").and_then(Value::as_str),
        node.name.as_deref(),
        parent_schema.get("title").and_then(Value::as_str),
        segment.as_deref(),
    );

    let ref_pointer = ctx.data_ref_pointer(&format!("{}{}", req.data_pointer_prefix, req.data_pointer));
    node.recursive_reference = true;
    node.reference = Some(ref_pointer.clone());
    node.widget = ctx.widget("$ref");
    node.options.insert("removable".to_string(), json!(false));
    node.options.insert("title".to_string(), json!(label));
    if let Some(max_items) = parent_schema.get("maxItems").filter(|v| v.is_number()) {
        node.options.insert("maxItems".to_string(), max_items.clone());
    }

    if !ctx.layout_refs.contains(&ref_pointer) {
        ctx.layout_refs.reserve(&ref_pointer);
        let template_req = SchemaNodeRequest {
            layout_pointer: String::new(),
            schema_pointer: ctx.schema_ref_pointer(&req.schema_pointer),
            data_pointer: String::new(),
            array_item: node.array_item_type.filter(|_| node.array_item),
            removable: Some(true),
            for_ref_library: true,
            data_pointer_prefix: format!("{}{}", req.data_pointer_prefix, req.data_pointer),
        };
        let built = build_schema_node(ctx, &template_req);
        store_template(ctx, &ref_pointer, built, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_order_wildcard() {
        let schema = json!({
            "ui:order": ["c", "*", "a"],
            "properties": { "a": {}, "b": {}, "c": {}, "d": {} }
        });
        let properties = schema["properties"].as_object().cloned().unwrap();
        assert_eq!(ordered_property_keys(&schema, &properties), vec!["c", "b", "d", "a"]);

        let plain = json!({ "properties": { "z": {}, "y": {} } });
        let properties = plain["properties"].as_object().cloned().unwrap();
        assert_eq!(ordered_property_keys(&plain, &properties), vec!["z", "y"]);
    }
}
