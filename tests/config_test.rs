use metis_forms::config::Settings;
use metis_forms::{FormCompiler, FormError};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_defaults_without_config_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;

    let settings = Settings::from_root(temp_dir.path())?;

    assert!(settings.form.add_submit);
    assert_eq!(settings.form.max_items_cap, 1000);
    assert!(settings.form.form_defaults.is_empty());
    Ok(())
}

#[test]
fn test_load_toml_config() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    let config_toml = r#"
[form]
add_submit = false
max_items_cap = 50

[form.form_defaults]
addable = false
placeholder = "..."
"#;
    fs::write(root.join("metis-forms.toml"), config_toml)?;

    let settings = Settings::from_root(root)?;

    assert!(!settings.form.add_submit);
    assert_eq!(settings.form.max_items_cap, 50);
    assert_eq!(settings.form.form_defaults["addable"], json!(false));
    assert_eq!(settings.form.form_defaults["placeholder"], json!("..."));
    Ok(())
}

#[test]
fn test_load_yaml_config() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    let config_yaml = r#"
form:
  max_items_cap: 7
"#;
    fs::write(root.join("metis-forms.yaml"), config_yaml)?;

    let settings = Settings::from_root(root)?;

    assert_eq!(settings.form.max_items_cap, 7);
    assert!(settings.form.add_submit);
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    let config_toml = r#"
[form]
max_items_cap = 0

[form.form_defaults]
properties = "x"
"#;
    fs::write(root.join("metis-forms.toml"), config_toml)?;

    let err = Settings::from_root(root).unwrap_err().to_string();
    assert!(err.contains("Configuration validation failed"));
    assert!(err.contains("form.max_items_cap"));
    assert!(err.contains("form.form_defaults.properties"));

    let compiler_err = FormCompiler::from_root(root).err().unwrap();
    assert!(matches!(compiler_err, FormError::Configuration(_)));
    Ok(())
}

#[test]
fn test_env_override() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;

    std::env::set_var("METIS_FORMS__FORM__FLAT_LIST", "false");
    let settings = Settings::from_root(temp_dir.path());
    std::env::remove_var("METIS_FORMS__FORM__FLAT_LIST");

    assert!(!settings?.form.flat_list);
    Ok(())
}

#[test]
fn test_compiler_uses_loaded_options() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::write(
        root.join("metis-forms.toml"),
        "[form]\nadd_submit = false\nmax_items_cap = 2\n",
    )?;

    let compiler = FormCompiler::from_root(root)?;
    let form = compiler.compile(
        Some(json!({ "type": "array", "items": { "type": "string" } })),
        None,
        Some(json!(["a", "b", "c"])),
    )?;

    assert_eq!(form.layout().len(), 1);
    assert_eq!(form.layout()[0].items.len(), 2);
    Ok(())
}
