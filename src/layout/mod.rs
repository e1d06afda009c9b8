//! Layout compilation
//!
//! A layout is a tree of [`LayoutNode`]s, each bound (or not) to a data
//! location and carrying the control type and merged options a renderer
//! needs. Layouts come either from a template (`builder`) or straight from
//! the schema (`from_schema`); array items and recursive references expand
//! from templates kept in the [`LayoutRefLibrary`].

pub mod builder;
pub mod context;
pub mod from_schema;
pub mod node;
pub mod ref_library;
pub mod title_map;
pub mod walker;

pub use builder::build_layout;
pub use context::{DataMap, DataMapEntry, FormContext};
pub use from_schema::build_layout_from_schema;
pub use node::{ArrayBounds, ArrayItemType, IdGenerator, LayoutNode, NodeId};
pub use ref_library::{LayoutRefLibrary, LayoutTemplate, ReferenceSite};
pub use title_map::{build_title_map, TitleMapEntry, TitleMapItem};
pub use walker::{map_layout, map_nodes, LayoutItem, Mapped};

#[cfg(test)]
mod builder_test;
