use thiserror::Error;

use crate::config::{FormOptions, Settings};
use crate::schema::options::STRUCTURAL_KEYWORDS;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_form(&settings.form) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_form(form: &FormOptions) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if form.max_items_cap == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "form.max_items_cap".to_string(),
                reason: "Cap must be greater than 0".to_string(),
            });
        }

        for name in form.form_defaults.keys() {
            if name.trim().is_empty() {
                errors.push(ValidationError::MissingField(
                    "form.form_defaults option name".to_string(),
                ));
            } else if STRUCTURAL_KEYWORDS.contains(&name.as_str()) {
                errors.push(ValidationError::InvalidValue {
                    field: format!("form.form_defaults.{}", name),
                    reason: "Structural schema keywords cannot be option defaults".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_config() {
        let settings = Settings::default();
        let result = ConfigValidator::validate(&settings);
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_cap() {
        let mut settings = Settings::default();
        settings.form.max_items_cap = 0;

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("max_items_cap"));
    }

    #[test]
    fn test_bad_option_names() {
        let mut settings = Settings::default();
        settings.form.form_defaults.insert(" ".to_string(), json!(true));
        settings.form.form_defaults.insert("items".to_string(), json!([]));
        settings.form.form_defaults.insert("addable".to_string(), json!(false));

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
