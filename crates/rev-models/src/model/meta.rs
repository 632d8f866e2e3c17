use super::instance::ModelInstance;
use crate::error::{ModelError, Result};
use crate::fields::Field;
use crate::operations::OperationKind;
use crate::validation::ModelValidationError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_BACKEND: &str = "default";

type ModelCheck = dyn Fn(&ModelInstance, OperationKind) -> Option<String> + Send + Sync;

/// A model-level (non-field) validation rule.
#[derive(Clone)]
pub struct ModelValidator {
    name: String,
    check: Arc<ModelCheck>,
}

impl ModelValidator {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ModelInstance, OperationKind) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, instance: &ModelInstance, operation: OperationKind) -> Option<ModelValidationError> {
        (self.check)(instance, operation).map(|message| ModelValidationError {
            code: self.name.clone(),
            message,
        })
    }
}

impl fmt::Debug for ModelValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registered shape of a model. Immutable once built.
#[derive(Debug)]
pub struct ModelMeta {
    name: String,
    label: String,
    backend: String,
    fields: Vec<Field>,
    fields_by_name: HashMap<String, usize>,
    primary_key: Option<String>,
    model_validators: Vec<ModelValidator>,
}

impl ModelMeta {
    pub fn builder(name: impl Into<String>) -> ModelMetaBuilder {
        ModelMetaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields_by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields_by_name.contains_key(name)
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn stored_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_stored())
    }

    pub fn model_validators(&self) -> &[ModelValidator] {
        &self.model_validators
    }
}

/// Registration-time builder for [`ModelMeta`].
///
/// Replaces decorator declarations with an explicit, ordered field list.
#[derive(Debug)]
pub struct ModelMetaBuilder {
    name: String,
    label: Option<String>,
    backend: String,
    fields: Vec<Field>,
    model_validators: Vec<ModelValidator>,
}

impl ModelMetaBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            backend: DEFAULT_BACKEND.to_string(),
            fields: Vec::new(),
            model_validators: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn model_validator(mut self, validator: ModelValidator) -> Self {
        self.model_validators.push(validator);
        self
    }

    /// Attaches every field and checks the model invariants: a non-empty
    /// name, unique field names, at most one primary key.
    pub fn build(self) -> Result<ModelMeta> {
        if self.name.trim().is_empty() {
            return Err(ModelError::config("models must have a name"));
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut fields_by_name = HashMap::new();
        let mut primary_key: Option<String> = None;

        for field in self.fields {
            let field = field.attach()?;
            if fields_by_name.contains_key(field.name()) {
                return Err(ModelError::config(format!(
                    "model '{}': duplicate field '{}'",
                    self.name,
                    field.name()
                )));
            }
            if field.is_primary_key() {
                if let Some(existing) = &primary_key {
                    return Err(ModelError::config(format!(
                        "model '{}': only one primary key is allowed ('{}' and '{}')",
                        self.name,
                        existing,
                        field.name()
                    )));
                }
                primary_key = Some(field.name().to_string());
            }
            fields_by_name.insert(field.name().to_string(), fields.len());
            fields.push(field);
        }

        Ok(ModelMeta {
            label: self.label.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            backend: self.backend,
            fields,
            fields_by_name,
            primary_key,
            model_validators: self.model_validators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(meta: &ModelMeta) -> Vec<&str> {
        meta.fields().iter().map(|f| f.name()).collect()
    }

    #[test]
    fn fields_keep_declaration_order() {
        let meta = ModelMeta::builder("User")
            .field(Field::auto_number("id").primary_key())
            .field(Field::text("name"))
            .field(Field::date("date_registered"))
            .build()
            .unwrap();

        assert_eq!(names(&meta), vec!["id", "name", "date_registered"]);
        assert_eq!(meta.primary_key(), Some("id"));
        assert_eq!(meta.field("name").unwrap().name(), "name");
        assert_eq!(meta.label(), "User");
        assert_eq!(meta.backend(), DEFAULT_BACKEND);
    }

    #[test]
    fn no_primary_key_when_none_declared() {
        let meta = ModelMeta::builder("Log")
            .field(Field::text("message"))
            .build()
            .unwrap();
        assert_eq!(meta.primary_key(), None);
    }

    #[test]
    fn rejects_two_primary_keys() {
        let err = ModelMeta::builder("Bad")
            .field(Field::integer("a").primary_key())
            .field(Field::integer("b").primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(ref msg) if msg.contains("only one primary key")));
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let err = ModelMeta::builder("Bad")
            .field(Field::text("name"))
            .field(Field::integer("name"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(ref msg) if msg.contains("duplicate field")));
    }

    #[test]
    fn rejects_unnamed_field() {
        let result = ModelMeta::builder("Bad").field(Field::text("")).build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unnamed_model() {
        assert!(ModelMeta::builder("").build().is_err());
    }

    #[test]
    fn stored_fields_skip_reverse_relations() {
        let meta = ModelMeta::builder("User")
            .field(Field::auto_number("id").primary_key())
            .field(Field::related_model_list("posts", "Post", "user"))
            .build()
            .unwrap();
        let stored: Vec<_> = meta.stored_fields().map(|f| f.name()).collect();
        assert_eq!(stored, vec!["id"]);
    }

    #[test]
    fn model_validator_reports_error() {
        let validator = ModelValidator::new("no_bob", |instance, _| {
            (instance.value("name") == Some(&serde_json::json!("Bob")))
                .then(|| "Bob is not allowed".to_string())
        });
        let bob = ModelInstance::new("User").with("name", serde_json::json!("Bob"));
        let err = validator.run(&bob, OperationKind::Create).unwrap();
        assert_eq!(err.code, "no_bob");
        assert!(validator
            .run(&ModelInstance::new("User"), OperationKind::Create)
            .is_none());
    }
}
