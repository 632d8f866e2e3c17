use super::{primary_key_value, OperationError, OperationKind, OperationResult};
use crate::error::Result;
use crate::manager::ModelManager;
use crate::model::ModelInstance;
use crate::query::Where;
use serde_json::Value;
use tracing::debug;

/// Removes every `model` record matching `where_`. Matching nothing is a
/// successful removal of zero records.
pub async fn run(manager: &ModelManager, model: &str, where_: &Value) -> Result<OperationResult> {
    let meta = manager.meta(model)?;
    let filter = Where::parse(&meta, where_)?;

    debug!(model = meta.name(), operation = "remove", stage = "executing");
    let affected = manager.backend_for(&meta)?.remove(&meta, &filter).await?;

    let mut result = OperationResult::new(OperationKind::Remove);
    result.affected = Some(affected);
    debug!(model = meta.name(), operation = "remove", stage = "complete", affected);
    Ok(result)
}

/// Removes the record identified by the primary key of `instance`, failing
/// with `not_found` when no such record exists.
pub async fn run_instance(
    manager: &ModelManager,
    instance: &ModelInstance,
) -> Result<OperationResult> {
    let meta = manager.meta(instance.model())?;
    let (key, pk) = primary_key_value(&meta, instance, OperationKind::Remove)?;
    let filter = Where::eq(pk, key.clone());

    debug!(model = meta.name(), operation = "remove", stage = "executing");
    let affected = manager.backend_for(&meta)?.remove(&meta, &filter).await?;

    let mut result = OperationResult::new(OperationKind::Remove);
    result.affected = Some(affected);
    if affected == 0 {
        result.add_error(OperationError::not_found(format!(
            "{} record to remove was not found",
            meta.name()
        )));
        debug!(model = meta.name(), operation = "remove", stage = "failed");
        return Ok(result);
    }
    debug!(model = meta.name(), operation = "remove", stage = "complete", affected);
    Ok(result)
}
