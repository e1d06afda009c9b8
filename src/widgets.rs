//! Widget registry port
//!
//! The layout compiler never renders anything. It asks a registry whether a
//! control type exists and attaches whatever opaque handle the registry
//! returns, so a renderer can plug in its own widget set.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

/// A renderable control implementation
pub trait Widget: Debug + Send + Sync {
    fn name(&self) -> &str;
}

pub type WidgetHandle = Arc<dyn Widget>;

/// Control-type name → widget lookup
pub trait WidgetRegistry: Send + Sync {
    fn has_widget(&self, control_type: &str) -> bool;
    fn get_widget(&self, control_type: &str) -> Option<WidgetHandle>;
}

/// Control types every renderer is expected to provide
pub const STANDARD_WIDGETS: &[&str] = &[
    "none",
    "$ref",
    "root",
    "section",
    "fieldset",
    "advancedfieldset",
    "authfieldset",
    "optionfieldset",
    "selectfieldset",
    "conditional",
    "actions",
    "flex",
    "tab",
    "tabs",
    "tabarray",
    "array",
    "wizard",
    "help",
    "message",
    "html",
    "template",
    "submit",
    "button",
    "reset",
    "text",
    "email",
    "password",
    "search",
    "tel",
    "url",
    "color",
    "number",
    "integer",
    "range",
    "updown",
    "date",
    "datetime",
    "datetime-local",
    "time",
    "month",
    "week",
    "alt-date",
    "alt-datetime",
    "file",
    "image",
    "hidden",
    "textarea",
    "select",
    "radio",
    "radios",
    "radios-inline",
    "radiobuttons",
    "checkbox",
    "checkboxes",
    "checkboxes-inline",
    "checkboxbuttons",
    "tagsinput",
    "one-of",
];

/// A widget known only by its control-type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedWidget {
    name: String,
}

impl NamedWidget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Widget for NamedWidget {
    fn name(&self) -> &str {
        &self.name
    }
}

/// In-memory registry preloaded with [`STANDARD_WIDGETS`].
///
/// Unknown types resolve to the `none` widget.
#[derive(Debug, Clone)]
pub struct BasicWidgetRegistry {
    widgets: HashMap<String, WidgetHandle>,
}

impl BasicWidgetRegistry {
    pub fn new() -> Self {
        let widgets = STANDARD_WIDGETS
            .iter()
            .map(|name| (name.to_string(), Arc::new(NamedWidget::new(*name)) as WidgetHandle))
            .collect();
        Self { widgets }
    }

    /// An empty registry
    pub fn empty() -> Self {
        Self {
            widgets: HashMap::new(),
        }
    }

    /// Add or replace the widget for a control type
    pub fn register(&mut self, control_type: impl Into<String>, widget: WidgetHandle) {
        self.widgets.insert(control_type.into(), widget);
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

impl Default for BasicWidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRegistry for BasicWidgetRegistry {
    fn has_widget(&self, control_type: &str) -> bool {
        self.widgets.contains_key(control_type)
    }

    fn get_widget(&self, control_type: &str) -> Option<WidgetHandle> {
        if let Some(widget) = self.widgets.get(control_type) {
            return Some(widget.clone());
        }
        warn!("No widget registered for \"{}\", using \"none\"", control_type);
        self.widgets.get("none").cloned()
    }
}
