use serde::Serialize;
use std::collections::BTreeMap;

/// An error attached to a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// An error about the instance as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelValidationError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub field_errors: BTreeMap<String, Vec<FieldError>>,
    pub model_errors: Vec<ModelValidationError>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            field_errors: BTreeMap::new(),
            model_errors: Vec::new(),
        }
    }

    pub fn add_field_error(&mut self, field: impl Into<String>, error: FieldError) {
        self.valid = false;
        self.field_errors.entry(field.into()).or_default().push(error);
    }

    pub fn add_model_error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.add_model_validation_error(ModelValidationError {
            code: code.into(),
            message: message.into(),
        });
    }

    pub fn add_model_validation_error(&mut self, error: ModelValidationError) {
        self.valid = false;
        self.model_errors.push(error);
    }

    pub fn errors_for(&self, field: &str) -> &[FieldError] {
        self.field_errors.get(field).map_or(&[], Vec::as_slice)
    }

    pub fn has_error(&self, field: &str, code: &str) -> bool {
        self.errors_for(field).iter().any(|e| e.code == code)
    }
}
