//! Depth-first layout tree mapping

use serde_json::Value;

use super::node::LayoutNode;

/// What a mapping callback produced for one node
#[derive(Debug)]
pub enum Mapped<T> {
    One(T),
    /// Fan-out; later siblings shift right
    Many(Vec<T>),
    /// Node removed; later siblings shift left
    Drop,
}

impl<T> Mapped<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Mapped::One(item) => vec![item],
            Mapped::Many(items) => items,
            Mapped::Drop => Vec::new(),
        }
    }
}

impl<T> From<Option<T>> for Mapped<T> {
    fn from(item: Option<T>) -> Self {
        item.map_or(Mapped::Drop, Mapped::One)
    }
}

/// A tree element whose children can be detached for mapping
pub trait LayoutItem: Sized {
    /// Detach the child list. `tabs` is read as an alias of `items`, and a
    /// single non-list child is treated as a one-element list.
    fn take_children(&mut self) -> Option<Vec<Self>>;
}

impl LayoutItem for Value {
    fn take_children(&mut self) -> Option<Vec<Value>> {
        let map = self.as_object_mut()?;
        let children = map.remove("items").or_else(|| map.remove("tabs"))?;
        Some(match children {
            Value::Array(items) => items,
            single => vec![single],
        })
    }
}

impl LayoutItem for LayoutNode {
    fn take_children(&mut self) -> Option<Vec<LayoutNode>> {
        if self.items.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.items))
        }
    }
}

/// Map a layout tree, children before their parent.
///
/// The callback receives the node with its children detached, the already
/// mapped children (if the node had any), the node's index among the mapped
/// siblings, and its pointer in the output tree (`/3/items/0`).
pub fn map_layout<T, U, F>(items: Vec<T>, prefix: &str, f: &mut F) -> Vec<U>
where
    T: LayoutItem,
    F: FnMut(T, Option<Vec<U>>, usize, &str) -> Mapped<U>,
{
    let mut mapped = Vec::with_capacity(items.len());
    for mut item in items {
        let index = mapped.len();
        let pointer = format!("{}/{}", prefix, index);
        let children = item
            .take_children()
            .map(|children| map_layout(children, &format!("{}/items", pointer), f));
        match f(item, children, index, &pointer) {
            Mapped::One(node) => mapped.push(node),
            Mapped::Many(nodes) => mapped.extend(nodes),
            Mapped::Drop => {}
        }
    }
    mapped
}

/// Map a node tree onto itself, reattaching mapped children before the
/// callback sees each node
pub fn map_nodes<F>(nodes: Vec<LayoutNode>, prefix: &str, f: &mut F) -> Vec<LayoutNode>
where
    F: FnMut(LayoutNode, usize, &str) -> Mapped<LayoutNode>,
{
    map_layout(nodes, prefix, &mut |mut node: LayoutNode, children, index, pointer: &str| {
        if let Some(children) = children {
            node.items = children;
        }
        f(node, index, pointer)
    })
}
