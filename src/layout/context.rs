//! Per-compilation state shared by the layout builders

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::node::IdGenerator;
use super::ref_library::LayoutRefLibrary;
use crate::config::FormOptions;
use crate::pointer::{self, WILDCARD};
use crate::schema::{remove_recursive_references, ResolvedSchema};
use crate::widgets::{WidgetHandle, WidgetRegistry};

/// What the form knows about one data location
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMapEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuple_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_items: Option<usize>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub validators: Map<String, Value>,
}

/// Shallowest generic data pointer → entry
pub type DataMap = BTreeMap<String, DataMapEntry>;

/// Everything one compilation reads and writes
pub struct FormContext {
    pub resolved: ResolvedSchema,
    pub initial_values: Value,
    pub options: FormOptions,
    pub registry: Arc<dyn WidgetRegistry>,
    pub layout_refs: LayoutRefLibrary,
    pub data_map: DataMap,
    pub ids: IdGenerator,
    /// Set once any node is marked required
    pub fields_required: bool,
}

impl FormContext {
    pub fn new(
        resolved: ResolvedSchema,
        initial_values: Option<Value>,
        options: FormOptions,
        registry: Arc<dyn WidgetRegistry>,
    ) -> Self {
        Self {
            resolved,
            initial_values: initial_values.unwrap_or(Value::Null),
            options,
            registry,
            layout_refs: LayoutRefLibrary::new(),
            data_map: DataMap::new(),
            ids: IdGenerator::new(),
            fields_required: false,
        }
    }

    pub fn schema(&self) -> &Value {
        &self.resolved.schema
    }

    /// Initial value at a data pointer, reading list positions as the first item
    pub fn initial_value(&self, data_pointer: &str) -> Option<&Value> {
        let segments = pointer::parse(data_pointer)?;
        let concrete: Vec<&str> = segments
            .iter()
            .map(|s| if s == WILDCARD { "0" } else { s.as_str() })
            .collect();
        pointer::get(&self.initial_values, &pointer::compile(&concrete))
    }

    /// Length of the initial array at a data pointer, zero when absent
    pub fn data_len(&self, data_pointer: &str) -> usize {
        self.initial_value(data_pointer)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    pub fn generic_pointer(&self, data_pointer: &str) -> String {
        pointer::to_generic_pointer(data_pointer, &self.resolved.array_map)
    }

    /// Shallowest equivalent of a data pointer
    pub fn data_ref_pointer(&self, data_pointer: &str) -> String {
        remove_recursive_references(
            data_pointer,
            &self.resolved.data_recursive_ref_map,
            &self.resolved.array_map,
        )
    }

    /// Shallowest equivalent of a schema pointer
    pub fn schema_ref_pointer(&self, schema_pointer: &str) -> String {
        remove_recursive_references(
            schema_pointer,
            &self.resolved.schema_recursive_ref_map,
            &self.resolved.array_map,
        )
    }

    pub fn data_entry(&mut self, ref_pointer: &str) -> &mut DataMapEntry {
        self.data_map.entry(ref_pointer.to_string()).or_default()
    }

    pub fn widget(&self, control_type: &str) -> Option<WidgetHandle> {
        self.registry.get_widget(control_type)
    }
}
