use super::{
    primary_key_value, to_record, validation_options, OperationError, OperationKind,
    OperationResult, UpdateOptions,
};
use crate::error::Result;
use crate::manager::ModelManager;
use crate::model::ModelInstance;
use crate::query::Where;
use crate::validation::validate;
use tracing::debug;

/// Validates the changed fields of `instance` and applies them to every
/// matching record.
///
/// Without `options.where_` the instance's own primary key selects the
/// record, and matching nothing ends with a `not_found` error. Auto-number
/// fields are never overwritten.
pub async fn run(
    manager: &ModelManager,
    instance: ModelInstance,
    options: &UpdateOptions,
) -> Result<OperationResult> {
    let meta = manager.meta(instance.model())?;
    let (filter, by_key) = match &options.where_ {
        Some(where_) => (Where::parse(&meta, where_)?, false),
        None => {
            let (key, pk) = primary_key_value(&meta, &instance, OperationKind::Update)?;
            (Where::eq(pk, key.clone()), true)
        }
    };

    debug!(model = meta.name(), operation = "update", stage = "validating");
    let validation = validate(
        &instance,
        &meta,
        OperationKind::Update,
        &validation_options(manager, options.fields.clone(), options.timeout),
    )
    .await?;
    if !validation.valid {
        debug!(model = meta.name(), operation = "update", stage = "failed");
        return Ok(OperationResult::validation_failed(
            OperationKind::Update,
            validation,
        ));
    }

    let mut changes = to_record(manager, &meta, &instance, options.fields.as_deref())?;
    for field in meta.fields().iter().filter(|f| f.is_auto_number()) {
        changes.remove(field.name());
    }

    debug!(model = meta.name(), operation = "update", stage = "executing");
    let affected = manager
        .backend_for(&meta)?
        .update(&meta, &changes, &filter)
        .await?;

    let mut result = OperationResult::new(OperationKind::Update);
    result.validation = Some(validation);
    result.affected = Some(affected);
    if by_key && affected == 0 {
        result.add_error(OperationError::not_found(format!(
            "{} record to update was not found",
            meta.name()
        )));
        debug!(model = meta.name(), operation = "update", stage = "failed");
        return Ok(result);
    }

    result.result = Some(instance);
    debug!(model = meta.name(), operation = "update", stage = "complete", affected);
    Ok(result)
}
