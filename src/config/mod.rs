use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub mod validator;

/// Environment prefix for overrides, e.g. `METIS_FORMS__FORM__ADD_SUBMIT=false`
pub const ENV_PREFIX: &str = "METIS_FORMS";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub form: FormOptions,
}

/// Global options applied to every compilation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormOptions {
    /// Append a submit control when the layout has none
    #[serde(default = "default_true")]
    pub add_submit: bool,
    /// Flatten grouped title maps unless a control asks otherwise
    #[serde(default = "default_true")]
    pub flat_list: bool,
    /// Upper bound on synthesized array items when the schema sets no `maxItems`
    #[serde(default = "default_max_items_cap")]
    pub max_items_cap: usize,
    /// Option defaults merged under every control's own options
    #[serde(default)]
    pub form_defaults: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

fn default_max_items_cap() -> usize {
    1000
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            add_submit: true,
            flat_list: true,
            max_items_cap: default_max_items_cap(),
            form_defaults: Map::new(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Load `metis-forms.{toml,yaml,json}` from `root` (optional), then
    /// `METIS_FORMS__*` environment overrides
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let config_path = root.as_ref().join("metis-forms");
        let s = Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("form.add_submit", true)?
            .set_default("form.flat_list", true)?
            .set_default("form.max_items_cap", 1000)?
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        validator::ConfigValidator::validate(&settings).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })?;

        Ok(settings)
    }
}
