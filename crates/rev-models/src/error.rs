use thiserror::Error;

/// Faults raised past the operation pipeline.
///
/// Expected outcomes (failed validation, no record to update) are not errors;
/// they are reported through [`crate::operations::OperationResult`].
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation of model '{model}' timed out after {timeout_ms} milliseconds")]
    ValidationTimeout { model: String, timeout_ms: u64 },

    #[error("Query error: {0}")]
    Query(String),

    #[error("Validator fault: {0}")]
    Validator(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ModelError::Configuration(message.into())
    }

    pub(crate) fn query(message: impl Into<String>) -> Self {
        ModelError::Query(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
