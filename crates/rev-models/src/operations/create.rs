use super::{to_record, validation_options, CreateOptions, OperationKind, OperationResult};
use crate::error::Result;
use crate::manager::ModelManager;
use crate::model::{ModelInstance, ModelMeta};
use crate::validation::validate;
use tracing::debug;

/// Validates `instance` and stores it through the model's backend.
///
/// Field defaults fill any field the instance leaves unset. On success
/// `result` holds the stored instance, including auto-assigned numbers.
pub async fn run(
    manager: &ModelManager,
    mut instance: ModelInstance,
    options: &CreateOptions,
) -> Result<OperationResult> {
    let meta = manager.meta(instance.model())?;
    apply_defaults(&meta, &mut instance);

    debug!(model = meta.name(), operation = "create", stage = "validating");
    let validation = validate(
        &instance,
        &meta,
        OperationKind::Create,
        &validation_options(manager, None, options.timeout),
    )
    .await?;
    if !validation.valid {
        debug!(model = meta.name(), operation = "create", stage = "failed");
        return Ok(OperationResult::validation_failed(
            OperationKind::Create,
            validation,
        ));
    }

    debug!(model = meta.name(), operation = "create", stage = "executing");
    let record = to_record(manager, &meta, &instance, None)?;
    let stored = manager.backend_for(&meta)?.create(&meta, record).await?;

    let mut result = OperationResult::new(OperationKind::Create);
    result.result = Some(ModelInstance::from_record(meta.name(), stored));
    result.validation = Some(validation);
    debug!(model = meta.name(), operation = "create", stage = "complete");
    Ok(result)
}

fn apply_defaults(meta: &ModelMeta, instance: &mut ModelInstance) {
    for field in meta.stored_fields() {
        if let Some(default) = &field.options().default {
            if !instance.contains(field.name()) {
                instance.set(field.name(), default.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::operations::OperationErrorCode;
    use crate::test_utils::{blog, user};
    use serde_json::json;

    #[tokio::test]
    async fn creates_and_assigns_primary_key() {
        let (manager, _) = blog();
        let result = run(&manager, user("Jim", "jim@example.com"), &CreateOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        let created = result.result.unwrap();
        assert_eq!(created.value("id"), Some(&json!(1)));
        assert_eq!(created.value("name"), Some(&json!("Jim")));
        assert!(result.validation.unwrap().valid);
    }

    #[tokio::test]
    async fn invalid_instance_is_not_stored() {
        let (manager, backend) = blog();
        let instance = ModelInstance::new("User").with("email", json!("jim@example.com"));

        let result = run(&manager, instance, &CreateOptions::default()).await.unwrap();

        assert!(!result.success);
        assert!(result.has_error(OperationErrorCode::ValidationFailed));
        assert!(result.validation.unwrap().has_error("name", "required"));
        assert_eq!(backend.count("User"), 0);
    }

    #[tokio::test]
    async fn defaults_fill_unset_fields() {
        let (manager, _) = blog();
        let result = run(&manager, user("Jim", "jim@example.com"), &CreateOptions::default())
            .await
            .unwrap();
        assert_eq!(result.result.unwrap().value("active"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn explicit_value_wins_over_default() {
        let (manager, _) = blog();
        let instance = user("Jim", "jim@example.com").with("active", json!(false));
        let result = run(&manager, instance, &CreateOptions::default()).await.unwrap();
        assert_eq!(result.result.unwrap().value("active"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn unknown_model_is_a_configuration_error() {
        let (manager, _) = blog();
        let err = run(&manager, ModelInstance::new("Nope"), &CreateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let (manager, backend) = blog();
        backend.set_simulate_failure(true);
        let err = run(&manager, user("Jim", "jim@example.com"), &CreateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Backend(_)));
    }
}
