//! Form compilation entry point

use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::{FormOptions, Settings};
use crate::error::{FormError, FormResult};
use crate::layout::{
    build_layout, DataMap, FormContext, LayoutNode, LayoutRefLibrary, ReferenceSite,
};
use crate::schema::{build_schema_from_data, resolve_schema_references, ResolvedSchema};
use crate::widgets::{BasicWidgetRegistry, WidgetRegistry};

/// Compiles schemas (plus optional layout and data) into layout trees.
///
/// The compiler holds no per-form state; every call to [`compile`] gets its
/// own context, so one compiler can serve many threads.
///
/// [`compile`]: FormCompiler::compile
#[derive(Clone)]
pub struct FormCompiler {
    options: FormOptions,
    registry: Arc<dyn WidgetRegistry>,
}

impl FormCompiler {
    pub fn new(options: FormOptions, registry: Arc<dyn WidgetRegistry>) -> Self {
        Self { options, registry }
    }

    /// Default options with the standard widget set
    pub fn with_defaults() -> Self {
        Self::new(FormOptions::default(), Arc::new(BasicWidgetRegistry::new()))
    }

    /// Options loaded from a `metis-forms` config file under `root`
    pub fn from_root(root: impl AsRef<Path>) -> FormResult<Self> {
        let settings =
            Settings::from_root(root).map_err(|e| FormError::Configuration(e.to_string()))?;
        Ok(Self::new(settings.form, Arc::new(BasicWidgetRegistry::new())))
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    /// Compile a form.
    ///
    /// Without a schema one is inferred from `data`. Without a layout the
    /// whole schema is laid out (`["*"]`).
    pub fn compile(
        &self,
        schema: Option<Value>,
        layout: Option<Value>,
        data: Option<Value>,
    ) -> FormResult<CompiledForm> {
        let schema = match (schema, &data) {
            (Some(schema @ Value::Object(_)), _) => schema,
            (Some(other), _) => {
                return Err(FormError::InvalidSchema(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
            (None, Some(data)) => build_schema_from_data(data, false),
            (None, None) => {
                return Err(FormError::InvalidSchema(
                    "no schema given and no data to infer one from".to_string(),
                ))
            }
        };
        let layout = match layout {
            None => vec![json!("*")],
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(FormError::InvalidLayout(format!(
                    "expected an array, got {}",
                    json_kind(&other)
                )))
            }
        };

        let resolved = resolve_schema_references(&schema);
        debug!(
            "Resolved schema: {} library entries, {} recursive references",
            resolved.ref_library.len(),
            resolved.schema_recursive_ref_map.len()
        );

        let mut context = FormContext::new(resolved, data, self.options.clone(), self.registry.clone());
        let layout = build_layout(&mut context, layout);
        debug!(
            "Compiled layout: {} top-level nodes, {} templates",
            layout.len(),
            context.layout_refs.len()
        );
        Ok(CompiledForm { layout, context })
    }

    /// Compile from JSON text
    pub fn compile_json(
        &self,
        schema: &str,
        layout: Option<&str>,
        data: Option<&str>,
    ) -> FormResult<CompiledForm> {
        let schema = serde_json::from_str(schema)?;
        let layout = layout.map(serde_json::from_str).transpose()?;
        let data = data.map(serde_json::from_str).transpose()?;
        self.compile(Some(schema), layout, data)
    }
}

impl Default for FormCompiler {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A compiled layout plus the context needed to expand it later
pub struct CompiledForm {
    layout: Vec<LayoutNode>,
    context: FormContext,
}

impl CompiledForm {
    pub fn layout(&self) -> &[LayoutNode] {
        &self.layout
    }

    pub fn into_layout(self) -> Vec<LayoutNode> {
        self.layout
    }

    /// The compiled schema
    pub fn schema(&self) -> &Value {
        self.context.schema()
    }

    pub fn resolved(&self) -> &ResolvedSchema {
        &self.context.resolved
    }

    pub fn data_map(&self) -> &DataMap {
        &self.context.data_map
    }

    pub fn layout_refs(&self) -> &LayoutRefLibrary {
        &self.context.layout_refs
    }

    /// Whether any control is marked required
    pub fn fields_required(&self) -> bool {
        self.context.fields_required
    }

    /// First node anywhere in the layout bound to a generic data pointer
    pub fn find(&self, data_pointer: &str) -> Option<&LayoutNode> {
        self.layout
            .iter()
            .find_map(|node| node.find_by_data_pointer(data_pointer))
    }

    /// Expand a `$ref` node: a fresh copy of the referenced template placed
    /// at the given data and layout pointers
    pub fn instantiate(
        &mut self,
        ref_pointer: &str,
        data_pointer: &str,
        layout_pointer: &str,
    ) -> Option<LayoutNode> {
        let site = ReferenceSite {
            ref_pointer,
            data_pointer,
            layout_pointer,
        };
        let context = &mut self.context;
        context.layout_refs.instantiate(&site, &mut context.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_object_schema() {
        let compiler = FormCompiler::with_defaults();
        let err = compiler.compile(Some(json!([1, 2])), None, None).err().unwrap();
        assert!(matches!(err, FormError::InvalidSchema(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_rejects_non_array_layout() {
        let compiler = FormCompiler::with_defaults();
        let err = compiler
            .compile(Some(json!({ "type": "object" })), Some(json!({ "key": "a" })), None)
            .err()
            .unwrap();
        assert!(matches!(err, FormError::InvalidLayout(_)));
    }

    #[test]
    fn test_missing_schema_and_data() {
        let compiler = FormCompiler::with_defaults();
        assert!(matches!(
            compiler.compile(None, None, None),
            Err(FormError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_schema_inferred_from_data() {
        let compiler = FormCompiler::with_defaults();
        let form = compiler
            .compile(None, None, Some(json!({ "city": "Oslo", "zip": 150 })))
            .unwrap();
        assert_eq!(form.find("/city").unwrap().node_type, "text");
        assert_eq!(form.find("/zip").unwrap().node_type, "number");
    }

    #[test]
    fn test_bad_json_text() {
        let compiler = FormCompiler::with_defaults();
        let err = compiler.compile_json("{ not json", None, None).err().unwrap();
        assert!(matches!(err, FormError::Json(_)));
    }
}
