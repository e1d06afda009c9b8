use serde::Serialize;
use serde_json::{Map, Value};

use super::title_map::TitleMapEntry;
use crate::widgets::WidgetHandle;

/// Unique identifier of a node within one compiled form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out node identifiers. Owned by a compilation, never shared.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        self.next += 1;
        NodeId(self.next)
    }
}

/// Position kind of an array item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayItemType {
    /// A fixed position described by one entry of a tuple `items` list
    Tuple,
    /// A repeatable position described by `items` or `additionalItems`
    List,
}

/// One element of a compiled layout tree
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    /// `None` on templates stored in the layout ref library
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Generic pointer of this node within the layout (`/-/items/-`)
    pub layout_pointer: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LayoutNode>,
    pub options: Map<String, Value>,
    pub array_item: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_item_type: Option<ArrayItemType>,
    pub recursive_reference: bool,
    /// Layout ref library key this node expands from
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_map: Option<Vec<TitleMapEntry>>,
    #[serde(skip)]
    pub widget: Option<WidgetHandle>,
}

impl LayoutNode {
    pub fn new(id: Option<NodeId>, layout_pointer: impl Into<String>) -> Self {
        Self {
            id,
            layout_pointer: layout_pointer.into(),
            ..Default::default()
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.options.get("title").and_then(Value::as_str)
    }

    /// Option flag, treating a missing option as `default`
    pub fn option_flag(&self, key: &str, default: bool) -> bool {
        self.options.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn is_reference(&self) -> bool {
        self.node_type == "$ref"
    }

    /// Number of nodes in this subtree, this node included
    pub fn count(&self) -> usize {
        1 + self.items.iter().map(LayoutNode::count).sum::<usize>()
    }

    /// Pre-order visit of this node and every descendant
    pub fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut LayoutNode),
    {
        f(self);
        for item in &mut self.items {
            item.visit_mut(f);
        }
    }

    /// First node in this subtree with the given data pointer
    pub fn find_by_data_pointer(&self, data_pointer: &str) -> Option<&LayoutNode> {
        if self.data_pointer.as_deref() == Some(data_pointer) {
            return Some(self);
        }
        self.items
            .iter()
            .find_map(|item| item.find_by_data_pointer(data_pointer))
    }
}

/// Replace every numeric layout pointer segment with `-`
pub fn to_generic_layout_pointer(layout_pointer: &str) -> String {
    layout_pointer
        .split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "-"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a key is an array index rather than a field name
pub fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Turn a field name into a label (`firstName` / `first_name` → `First Name`)
pub fn fix_title(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for ch in name.chars() {
        if ch == '_' {
            spaced.push(' ');
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower {
            spaced.push(' ');
        }
        previous_lower = ch.is_lowercase();
        spaced.push(ch);
    }
    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Label for an array's "add" control.
///
/// Uses the explicit title when there is one, then the field name, then the
/// parent schema's title, then the pointer segment.
pub fn add_button_label(
    title: Option<&str>,
    name: Option<&str>,
    parent_title: Option<&str>,
    segment: Option<&str>,
) -> String {
    let starts_with_add = |label: &str| {
        let lower = label.to_lowercase();
        lower == "add" || lower.starts_with("add ")
    };
    let label = title
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| name.filter(|n| !is_index(n)).map(fix_title));
    match label {
        Some(label) if starts_with_add(&label) => label,
        Some(label) => format!("Add {}", label),
        None => match parent_title.or(segment.filter(|s| !is_index(s))) {
            Some(parent) if parent_title.is_some() => format!("Add to {}", parent),
            Some(segment) => format!("Add to {}", fix_title(segment)),
            None => "Add".to_string(),
        },
    }
}

// ============================================================================
// Array Cardinality
// ============================================================================

/// Item counts for an array control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayBounds {
    pub max_items: usize,
    pub min_items: usize,
    pub tuple_items: usize,
    pub list_items: usize,
}

impl ArrayBounds {
    /// Combine schema and node option limits.
    ///
    /// `cap` stands in for a missing `maxItems`. With `required` set, an
    /// array without a `minItems` needs one item.
    pub fn new(schema: &Value, options: &Map<String, Value>, cap: usize, required: bool) -> Self {
        let limit = |value: Option<&Value>| value.and_then(Value::as_u64).map(|n| n as usize);
        let max_items = limit(schema.get("maxItems"))
            .unwrap_or(cap)
            .min(limit(options.get("maxItems")).unwrap_or(cap));
        let mut min_items = limit(schema.get("minItems"))
            .unwrap_or(0)
            .max(limit(options.get("minItems")).unwrap_or(0));
        if min_items == 0 && required {
            min_items = 1;
        }
        let mut list_items = limit(options.get("listItems")).unwrap_or(1);
        let mut tuple_items = schema.get("items").and_then(Value::as_array).map_or(0, Vec::len);

        if max_items < tuple_items {
            tuple_items = max_items;
            list_items = 0;
        } else if max_items < tuple_items + list_items {
            list_items = max_items - tuple_items;
        } else if min_items > tuple_items + list_items {
            list_items = min_items - tuple_items;
        }

        Self {
            max_items,
            min_items,
            tuple_items,
            list_items,
        }
    }

    /// Number of item slots to lay out for `data_len` existing values
    pub fn instance_count(&self, data_len: usize) -> usize {
        (self.tuple_items + self.list_items)
            .max(data_len)
            .min(self.max_items)
    }

    pub fn write_options(&self, options: &mut Map<String, Value>) {
        options.insert("maxItems".to_string(), Value::from(self.max_items));
        options.insert("minItems".to_string(), Value::from(self.min_items));
        options.insert("tupleItems".to_string(), Value::from(self.tuple_items));
        options.insert("listItems".to_string(), Value::from(self.list_items));
    }
}
