//! Layout templates for array items and recursive references

use std::collections::HashMap;
use tracing::debug;

use super::node::{IdGenerator, LayoutNode};
use super::walker::{map_nodes, Mapped};
use crate::pointer::WILDCARD;

/// A stored template
#[derive(Clone, Debug)]
pub struct LayoutTemplate {
    pub node: LayoutNode,
    /// Pointers are relative to the instantiation site
    pub relative: bool,
}

impl LayoutTemplate {
    pub fn new(mut node: LayoutNode, relative: bool) -> Self {
        node.visit_mut(&mut |n| n.id = None);
        Self { node, relative }
    }

    /// Deep-clone the template with fresh identifiers.
    ///
    /// Relative templates get the site's data pointer prepended to their data
    /// pointers, and the site's layout pointer (less its trailing `/-`)
    /// prepended to their layout pointers.
    pub fn instantiate(&self, site: &ReferenceSite<'_>, ids: &mut IdGenerator) -> Option<LayoutNode> {
        let layout_prefix = site
            .layout_pointer
            .strip_suffix(&format!("/{}", WILDCARD))
            .unwrap_or(site.layout_pointer);

        let mut instance = map_nodes(vec![self.node.clone()], "", &mut |mut node, _, _| {
            node.id = Some(ids.next_id());
            if self.relative {
                if let Some(data_pointer) = &node.data_pointer {
                    node.data_pointer = Some(format!("{}{}", site.data_pointer, data_pointer));
                }
                node.layout_pointer = format!("{}{}", layout_prefix, node.layout_pointer);
            }
            Mapped::One(node)
        });
        instance.pop()
    }
}

/// Where a template is being instantiated
#[derive(Clone, Copy, Debug)]
pub struct ReferenceSite<'a> {
    pub ref_pointer: &'a str,
    pub data_pointer: &'a str,
    pub layout_pointer: &'a str,
}

/// Reference pointer → layout template.
///
/// An entry is reserved before its template is built; a nested build of the
/// same reference finds the reservation and stops there.
#[derive(Clone, Debug, Default)]
pub struct LayoutRefLibrary {
    templates: HashMap<String, Option<LayoutTemplate>>,
}

impl LayoutRefLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pointer has a template or a reservation
    pub fn contains(&self, ref_pointer: &str) -> bool {
        self.templates.contains_key(ref_pointer)
    }

    pub fn is_reserved(&self, ref_pointer: &str) -> bool {
        matches!(self.templates.get(ref_pointer), Some(None))
    }

    pub fn reserve(&mut self, ref_pointer: &str) {
        self.templates.insert(ref_pointer.to_string(), None);
    }

    /// Store a template, dropping its node identifiers
    pub fn insert(&mut self, ref_pointer: &str, node: LayoutNode, relative: bool) {
        self.insert_template(ref_pointer, LayoutTemplate::new(node, relative));
    }

    pub fn insert_template(&mut self, ref_pointer: &str, template: LayoutTemplate) {
        self.templates.insert(ref_pointer.to_string(), Some(template));
    }

    pub fn remove(&mut self, ref_pointer: &str) {
        self.templates.remove(ref_pointer);
    }

    pub fn get(&self, ref_pointer: &str) -> Option<&LayoutTemplate> {
        self.templates.get(ref_pointer).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.templates.keys()
    }

    /// Visit every stored template
    pub fn for_each_template_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut LayoutNode),
    {
        for template in self.templates.values_mut().flatten() {
            f(&mut template.node);
        }
    }

    /// Instantiate the stored template for the site's reference pointer
    pub fn instantiate(&self, site: &ReferenceSite<'_>, ids: &mut IdGenerator) -> Option<LayoutNode> {
        let Some(template) = self.get(site.ref_pointer) else {
            debug!("No layout template for {}", site.ref_pointer);
            return None;
        };
        template.instantiate(site, ids)
    }
}
