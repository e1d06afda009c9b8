//! `$ref` discovery, classification and schema compilation
//!
//! Compiling inlines every reference that does not lead back into itself
//! and leaves the rest as `$ref` nodes pointing at the shallowest copy of
//! their target inside the compiled schema.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::merge::{combine_all_of, fix_required_array_properties, merge_schemas};
use super::{walk_schemas, ArrayMap, RecursiveRefMap, RefLibrary, SchemaRole};
use crate::pointer;

// ============================================================================
// Reference Graph
// ============================================================================

/// A `$ref` link from the pointer of the referencing node to its target
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefLink {
    pub from: String,
    pub to: String,
}

impl RefLink {
    /// The target contains the source, so following the link re-enters it
    pub fn targets_ancestor(&self) -> bool {
        pointer::is_sub_pointer(&self.to, &self.from)
    }
}

/// All references of a schema, their transitive closure, and which of them
/// take part in a cycle
#[derive(Clone, Debug, Default)]
pub struct ReferenceGraph {
    links: Vec<RefLink>,
    closure: BTreeSet<RefLink>,
    recursive: BTreeSet<String>,
}

impl ReferenceGraph {
    /// Discover every `$ref` in a raw schema and classify it
    pub fn discover(schema: &Value) -> Self {
        let mut links = Vec::new();
        walk_schemas(schema, "", SchemaRole::Schema, &mut |node, at| {
            let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
                return;
            };
            if pointer::is_pointer(reference) {
                links.push(RefLink {
                    from: at.to_string(),
                    to: pointer::normalize(reference),
                });
            } else {
                warn!("Unsupported $ref \"{}\" at {}", reference, at);
            }
        });

        let closure = Self::transitive_closure(&links);
        let recursive = Self::classify(&links, &closure);
        debug!(
            "Found {} $ref links ({} composite, {} recursive)",
            links.len(),
            closure.len() - links.len().min(closure.len()),
            recursive.len()
        );
        Self {
            links,
            closure,
            recursive,
        }
    }

    /// Add `A → C` for every `A → B` whose target `B` contains a link `B… → C`,
    /// until nothing new appears. Sources and targets are finite, so this ends.
    fn transitive_closure(links: &[RefLink]) -> BTreeSet<RefLink> {
        let mut closure: BTreeSet<RefLink> = links.iter().cloned().collect();
        loop {
            let mut added = Vec::new();
            for composite in &closure {
                for link in links {
                    if !pointer::is_sub_pointer(&composite.to, &link.from) {
                        continue;
                    }
                    let candidate = RefLink {
                        from: composite.from.clone(),
                        to: link.to.clone(),
                    };
                    if !closure.contains(&candidate) {
                        added.push(candidate);
                    }
                }
            }
            if added.is_empty() {
                return closure;
            }
            closure.extend(added);
        }
    }

    /// A link is recursive when it, or a composite starting at it, targets an
    /// ancestor of its source. Links starting inside anything reachable from
    /// a recursive link are recursive too.
    fn classify(links: &[RefLink], closure: &BTreeSet<RefLink>) -> BTreeSet<String> {
        let mut recursive: BTreeSet<String> = closure
            .iter()
            .filter(|link| link.targets_ancestor())
            .map(|link| link.from.clone())
            .collect();
        loop {
            let reachable: Vec<&str> = closure
                .iter()
                .filter(|link| recursive.contains(&link.from))
                .map(|link| link.to.as_str())
                .collect();
            let newly: Vec<String> = links
                .iter()
                .filter(|link| !recursive.contains(&link.from))
                .filter(|link| reachable.iter().any(|t| pointer::is_sub_pointer(t, &link.from)))
                .map(|link| link.from.clone())
                .collect();
            if newly.is_empty() {
                return recursive;
            }
            recursive.extend(newly);
        }
    }

    /// Links found in the schema, in document order
    pub fn links(&self) -> &[RefLink] {
        &self.links
    }

    /// Direct and composite links
    pub fn closure(&self) -> impl Iterator<Item = &RefLink> {
        self.closure.iter()
    }

    /// Whether the `$ref` at `from` takes part in a cycle
    pub fn is_recursive(&self, from: &str) -> bool {
        self.recursive.contains(from)
    }

    pub fn recursive_links(&self) -> impl Iterator<Item = &RefLink> {
        self.links.iter().filter(|link| self.is_recursive(&link.from))
    }

    /// Distinct reference targets
    pub fn targets(&self) -> BTreeSet<String> {
        self.links.iter().map(|link| link.to.clone()).collect()
    }
}

// ============================================================================
// Schema Compilation
// ============================================================================

/// A schema object on the current compilation path: where it came from in
/// the raw schema and where it lands in the compiled one
struct Frame {
    source: String,
    at: String,
}

struct SchemaCompiler<'a> {
    root: &'a Value,
    graph: &'a ReferenceGraph,
    stack: Vec<Frame>,
}

impl<'a> SchemaCompiler<'a> {
    fn new(root: &'a Value, graph: &'a ReferenceGraph) -> Self {
        Self {
            root,
            graph,
            stack: Vec::new(),
        }
    }

    fn compile(&mut self, value: &Value, source: &str, at: &str, role: SchemaRole) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.compile(
                            item,
                            &format!("{}/{}", source, i),
                            &format!("{}/{}", at, i),
                            SchemaRole::Schema,
                        )
                    })
                    .collect(),
            ),
            Value::Object(map) if role == SchemaRole::SchemaMap => {
                let mut compiled = Map::new();
                for (name, child) in map {
                    let segment = pointer::escape(name);
                    let child = self.compile(
                        child,
                        &format!("{}/{}", source, segment),
                        &format!("{}/{}", at, segment),
                        SchemaRole::Schema,
                    );
                    compiled.insert(name.clone(), child);
                }
                Value::Object(compiled)
            }
            Value::Object(map) => {
                self.stack.push(Frame {
                    source: source.to_string(),
                    at: at.to_string(),
                });
                let compiled = self.compile_schema(map, source, at);
                self.stack.pop();
                compiled
            }
            other => other.clone(),
        }
    }

    fn compile_schema(&mut self, map: &Map<String, Value>, source: &str, at: &str) -> Value {
        let reference = map
            .get("$ref")
            .and_then(Value::as_str)
            .filter(|r| pointer::is_pointer(r))
            .map(str::to_string);
        let mut members = self.compile_members(map, source, at);
        let Some(reference) = reference else {
            return finish(Value::Object(members));
        };

        let target = pointer::normalize(&reference);
        members.remove("$ref");

        if self.graph.is_recursive(source) {
            if let Some(frame) = self.stack.iter().find(|frame| frame.source == target) {
                members.insert("$ref".to_string(), Value::String(format!("#{}", frame.at)));
                return finish(Value::Object(members));
            }
        }

        let Some(target_schema) = pointer::get(self.root, &target) else {
            warn!("Unable to resolve $ref \"{}\" at {}", reference, source);
            return finish(Value::Object(members));
        };
        let inlined = self.compile(target_schema, &target, at, SchemaRole::Schema);
        if members.is_empty() {
            finish(inlined)
        } else {
            finish(merge_schemas(&[Value::Object(members), inlined]))
        }
    }

    fn compile_members(&mut self, map: &Map<String, Value>, source: &str, at: &str) -> Map<String, Value> {
        let mut members = Map::new();
        for (key, value) in map {
            if source.is_empty() && (key == "definitions" || key == "$defs") {
                continue;
            }
            let Some(role) = SchemaRole::of_keyword(key) else {
                members.insert(key.clone(), value.clone());
                continue;
            };
            let segment = pointer::escape(key);
            let child_source = format!("{}/{}", source, segment);
            let compiled = match (key.as_str(), value) {
                // allOf members are merged into this node, so they compile in place
                ("allOf", Value::Array(items)) => Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            self.compile(item, &format!("{}/{}", child_source, i), at, SchemaRole::Schema)
                        })
                        .collect(),
                ),
                _ => self.compile(value, &child_source, &format!("{}/{}", at, segment), role),
            };
            members.insert(key.clone(), compiled);
        }
        members
    }
}

fn finish(schema: Value) -> Value {
    fix_required_array_properties(combine_all_of(schema))
}

// ============================================================================
// Resolution Result
// ============================================================================

/// A compiled schema plus the lookup tables built alongside it
#[derive(Clone, Debug, Default)]
pub struct ResolvedSchema {
    /// Schema with non-recursive references inlined and `allOf` merged
    pub schema: Value,
    /// Reference target → resolved sub-schema. Holds both raw-schema targets
    /// and the compiled-schema targets of recursive references.
    pub ref_library: RefLibrary,
    /// Compiled schema pointer of a recursive `$ref` → its target
    pub schema_recursive_ref_map: RecursiveRefMap,
    /// The same map projected onto data pointers
    pub data_recursive_ref_map: RecursiveRefMap,
    /// Generic data pointer of each array → tuple item count
    pub array_map: ArrayMap,
    /// Links discovered in the raw schema
    pub graph: ReferenceGraph,
}

impl ResolvedSchema {
    /// Sub-schema at a compiled schema pointer, falling back to the library
    pub fn schema_at(&self, schema_pointer: &str) -> Option<&Value> {
        pointer::get(&self.schema, schema_pointer)
            .or_else(|| self.ref_library.get(&pointer::normalize(schema_pointer)))
    }
}

/// Resolve every `$ref` in a schema and build the compilation tables
pub fn resolve_schema_references(schema: &Value) -> ResolvedSchema {
    let graph = ReferenceGraph::discover(schema);
    let compiled = SchemaCompiler::new(schema, &graph).compile(schema, "", "", SchemaRole::Schema);

    let mut ref_library = RefLibrary::new();
    for target in graph.targets() {
        match pointer::get(schema, &target) {
            Some(raw) => {
                let resolved =
                    SchemaCompiler::new(schema, &graph).compile(raw, &target, &target, SchemaRole::Schema);
                ref_library.insert(target, resolved);
            }
            None => warn!("Reference target {} not found in schema", target),
        }
    }

    let mut schema_recursive_ref_map = RecursiveRefMap::new();
    let mut data_recursive_ref_map = RecursiveRefMap::new();
    let mut array_map = ArrayMap::new();

    walk_schemas(&compiled, "", SchemaRole::Schema, &mut |node, at| {
        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            let target = pointer::normalize(reference);
            if let Some(resolved) = pointer::get(&compiled, &target) {
                ref_library.insert(target.clone(), resolved.clone());
            }
            let from_data = pointer::to_data_pointer(at, &compiled);
            let to_data = pointer::to_data_pointer(&target, &compiled);
            if let (Some(from_data), Some(to_data)) = (from_data, to_data) {
                data_recursive_ref_map.insert(from_data, to_data);
            }
            schema_recursive_ref_map.insert(at.to_string(), target);
        }

        let is_array = node.get("type").and_then(Value::as_str) == Some("array");
        if is_array && (node.contains_key("items") || node.contains_key("additionalItems")) {
            if let Some(data_pointer) = pointer::to_data_pointer(at, &compiled) {
                let tuple_items = node.get("items").and_then(Value::as_array).map_or(0, Vec::len);
                array_map.insert(data_pointer, tuple_items);
            }
        }
    });

    ResolvedSchema {
        schema: compiled,
        ref_library,
        schema_recursive_ref_map,
        data_recursive_ref_map,
        array_map,
        graph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree_schema() -> Value {
        json!({
            "type": "object",
            "definitions": {
                "node": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "children": { "type": "array", "items": { "$ref": "#/definitions/node" } }
                    }
                }
            },
            "properties": {
                "tree": { "$ref": "#/definitions/node" }
            }
        })
    }

    #[test]
    fn test_non_recursive_refs_are_inlined() {
        let schema = json!({
            "type": "object",
            "definitions": {
                "address": { "type": "object", "properties": { "city": { "type": "string" } } }
            },
            "properties": {
                "home": { "$ref": "#/definitions/address", "title": "Home" },
                "work": { "$ref": "#/definitions/address" }
            }
        });
        let resolved = resolve_schema_references(&schema);
        assert!(resolved.schema.get("definitions").is_none());
        assert_eq!(resolved.schema["properties"]["home"]["title"], "Home");
        assert_eq!(resolved.schema["properties"]["home"]["properties"]["city"]["type"], "string");
        assert_eq!(resolved.schema["properties"]["work"]["type"], "object");
        assert!(resolved.schema_recursive_ref_map.is_empty());
        assert!(resolved.ref_library.contains_key("/definitions/address"));
        assert_eq!(resolved.graph.recursive_links().count(), 0);
    }

    #[test]
    fn test_recursive_ref_points_at_shallowest_copy() {
        let resolved = resolve_schema_references(&tree_schema());
        let tree = &resolved.schema["properties"]["tree"];
        assert_eq!(tree["properties"]["name"]["type"], "string");
        assert_eq!(tree["properties"]["children"]["items"]["$ref"], "#/properties/tree");

        assert_eq!(
            resolved.schema_recursive_ref_map["/properties/tree/properties/children/items"],
            "/properties/tree"
        );
        assert_eq!(resolved.data_recursive_ref_map["/tree/children/-"], "/tree");
        assert_eq!(resolved.array_map["/tree/children"], 0);
        assert!(resolved.ref_library.contains_key("/properties/tree"));
    }

    #[test]
    fn test_mutual_recursion_is_classified() {
        let schema = json!({
            "definitions": {
                "a": { "type": "object", "properties": { "b": { "$ref": "#/definitions/b" } } },
                "b": { "type": "object", "properties": { "a": { "$ref": "#/definitions/a" } } }
            },
            "type": "object",
            "properties": { "start": { "$ref": "#/definitions/a" } }
        });
        let resolved = resolve_schema_references(&schema);
        let graph = &resolved.graph;
        assert!(!graph.is_recursive("/properties/start"));
        assert!(graph.is_recursive("/definitions/a/properties/b"));
        assert!(graph.is_recursive("/definitions/b/properties/a"));
        assert!(graph.closure().any(|link| link.from == "/definitions/a/properties/b"
            && link.to == "/definitions/a"));

        let start = &resolved.schema["properties"]["start"];
        assert_eq!(start["properties"]["b"]["type"], "object");
        assert_eq!(start["properties"]["b"]["properties"]["a"]["$ref"], "#/properties/start");
        assert_eq!(resolved.data_recursive_ref_map["/start/b/a"], "/start");
    }

    #[test]
    fn test_all_of_collapsed() {
        let schema = json!({
            "type": "object",
            "properties": {
                "age": { "allOf": [{ "type": "integer", "minimum": 0 }, { "minimum": 18 }] }
            }
        });
        let resolved = resolve_schema_references(&schema);
        assert_eq!(
            resolved.schema["properties"]["age"],
            json!({ "type": "integer", "minimum": 18 })
        );
    }

    #[test]
    fn test_tuple_arrays_recorded() {
        let schema = json!({
            "type": "object",
            "properties": {
                "point": { "type": "array", "items": [{ "type": "number" }, { "type": "number" }] },
                "tags": { "type": "array", "items": { "type": "string" } }
            }
        });
        let resolved = resolve_schema_references(&schema);
        assert_eq!(resolved.array_map["/point"], 2);
        assert_eq!(resolved.array_map["/tags"], 0);
    }

    #[test]
    fn test_unresolvable_ref_is_skipped() {
        let schema = json!({
            "type": "object",
            "properties": { "ghost": { "$ref": "#/definitions/missing", "title": "Ghost" } }
        });
        let resolved = resolve_schema_references(&schema);
        assert_eq!(resolved.schema["properties"]["ghost"], json!({ "title": "Ghost" }));
    }
}
