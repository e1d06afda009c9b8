use thiserror::Error;

/// Errors that reject a compilation request outright.
///
/// Problems local to one sub-tree (an unresolvable pointer, an unknown layout
/// entry) are logged and skipped instead, so they never show up here.
#[derive(Debug, Error)]
pub enum FormError {
    /// The schema is not a JSON object
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// The layout is not an array of layout entries
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Form options could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FormResult<T> = Result<T, FormError>;
