//! # Metis Forms - JSON Schema Form Compiler
//!
//! Metis Forms compiles a JSON Schema, an optional layout template and
//! optional initial data into a renderable layout tree: typed controls with
//! resolved data bindings, merged options, title maps and array cardinality.
//!
//! ## Features
//!
//! - **Reference resolution**: non-recursive `$ref`s inlined, `allOf` merged,
//!   recursive references kept as pointer tables so compilation terminates
//! - **Two layout modes**: template-driven (`["name", {"key": "tags"}, "*"]`)
//!   or generated straight from the schema
//! - **Arrays**: tuple and list items, `minItems`/`maxItems` bounds, "add" controls
//! - **Title maps**: from `enum`, `enumNames`, `oneOf` or explicit `titleMap`, with grouping
//! - **Pluggable widgets**: any [`widgets::WidgetRegistry`] supplies control handles
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metis_forms::compiler::FormCompiler;
//! use serde_json::json;
//!
//! fn main() -> anyhow::Result<()> {
//!     let compiler = FormCompiler::with_defaults();
//!     let schema = json!({
//!         "type": "object",
//!         "properties": { "name": { "type": "string" } },
//!         "required": ["name"]
//!     });
//!     let form = compiler.compile(Some(schema), None, None)?;
//!     assert_eq!(form.layout()[0].node_type, "text");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **pointer**: JSON pointer algebra shared by everything else
//! - **schema**: reference resolution, merging and per-field inference
//! - **layout**: layout node model, builders, ref library and tree walker
//! - **widgets**: the widget registry port
//! - **config**: global form options

pub mod compiler;
pub mod config;
pub mod error;
pub mod layout;
pub mod pointer;
pub mod schema;
pub mod widgets;

pub use compiler::{CompiledForm, FormCompiler};
pub use error::{FormError, FormResult};
