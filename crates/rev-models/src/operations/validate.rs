use super::{validation_options, OperationKind};
use crate::error::Result;
use crate::manager::ModelManager;
use crate::model::ModelInstance;
use crate::validation::{self, ValidationResult};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Operation the validators should assume.
    pub operation: OperationKind,
    /// Field scope for `update`; see [`crate::validation`].
    pub fields: Option<Vec<String>>,
    pub timeout: Option<Duration>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            operation: OperationKind::Create,
            fields: None,
            timeout: None,
        }
    }
}

/// Validates `instance` against its registered model without storing it.
pub async fn run(
    manager: &ModelManager,
    instance: &ModelInstance,
    options: &ValidateOptions,
) -> Result<ValidationResult> {
    let meta = manager.meta(instance.model())?;
    validation::validate(
        instance,
        &meta,
        options.operation,
        &validation_options(manager, options.fields.clone(), options.timeout),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::test_utils::{blog, user};
    use serde_json::json;

    #[tokio::test]
    async fn validates_without_storing() {
        let (manager, backend) = blog();
        let result = run(&manager, &user("Ann", "ann@example.com"), &ValidateOptions::default())
            .await
            .unwrap();
        assert!(result.valid);
        assert_eq!(backend.count("User"), 0);
    }

    #[tokio::test]
    async fn reports_field_errors() {
        let (manager, _) = blog();
        let result = run(&manager, &user("Ann", "nope"), &ValidateOptions::default())
            .await
            .unwrap();
        assert!(!result.valid);
        assert!(result.has_error("email", "not_an_email"));
    }

    #[tokio::test]
    async fn update_scope_is_honoured() {
        let (manager, _) = blog();
        let options = ValidateOptions {
            operation: OperationKind::Update,
            ..ValidateOptions::default()
        };
        let partial = ModelInstance::new("User").with("age", json!(30));
        let result = run(&manager, &partial, &options).await.unwrap();
        assert!(result.valid);
    }

    #[tokio::test]
    async fn unregistered_model_is_a_configuration_error() {
        let (manager, _) = blog();
        let err = run(&manager, &ModelInstance::new("Ghost"), &ValidateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }
}
