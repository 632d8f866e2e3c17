//! Relation resolution for `read`.
//!
//! Each requested field costs exactly one backend read, whatever the number
//! of parent records:
//!
//! - forward (`RelatedModel`): read the target where `pk _in [foreign keys]`
//! - reverse (`RelatedModelList`): read the target where
//!   `back_ref _in [parent primary keys]`
//!
//! Resolved instances carry only their own scalar fields; nested relations
//! are not followed.

use super::read::hydrate;
use crate::backend::Page;
use crate::error::{ModelError, Result};
use crate::fields::{Field, FieldKind};
use crate::manager::ModelManager;
use crate::model::{FieldValue, ModelInstance, ModelMeta, Record};
use crate::query::{values_equal, Where};
use serde_json::Value;

pub(crate) async fn resolve(
    manager: &ModelManager,
    meta: &ModelMeta,
    field_name: &str,
    records: &[Record],
    instances: &mut [ModelInstance],
) -> Result<()> {
    let field = meta.field(field_name).ok_or_else(|| {
        ModelError::query(format!(
            "'{}' is not a relation field of model {}",
            field_name,
            meta.name()
        ))
    })?;

    match field.kind() {
        FieldKind::RelatedModel { model } => {
            resolve_forward(manager, field, model, records, instances).await
        }
        FieldKind::RelatedModelList { model, field: back_ref } => {
            resolve_reverse(manager, meta, field, model, back_ref, records, instances).await
        }
        _ => Err(ModelError::query(format!(
            "'{}' is not a relation field of model {}",
            field_name,
            meta.name()
        ))),
    }
}

async fn resolve_forward(
    manager: &ModelManager,
    field: &Field,
    target: &str,
    records: &[Record],
    instances: &mut [ModelInstance],
) -> Result<()> {
    let target_meta = manager.meta(target)?;
    let pk = target_primary_key(&target_meta, field)?;

    let keys = distinct(records.iter().filter_map(|r| r.get(field.name())));
    let targets = if keys.is_empty() {
        Vec::new()
    } else {
        manager
            .backend_for(&target_meta)?
            .read(&target_meta, &Where::is_in(pk, keys), &[], Page::unbounded())
            .await?
            .records
    };

    for (record, instance) in records.iter().zip(instances.iter_mut()) {
        let related = record.get(field.name()).and_then(|key| {
            targets
                .iter()
                .find(|t| t.get(pk).is_some_and(|v| values_equal(v, key)))
                .map(|t| Box::new(hydrate(&target_meta, t, &[])))
        });
        instance.set(field.name(), FieldValue::Related(related));
    }
    Ok(())
}

async fn resolve_reverse(
    manager: &ModelManager,
    meta: &ModelMeta,
    field: &Field,
    target: &str,
    back_ref: &str,
    records: &[Record],
    instances: &mut [ModelInstance],
) -> Result<()> {
    let target_meta = manager.meta(target)?;
    match target_meta.field(back_ref).map(Field::kind) {
        Some(FieldKind::RelatedModel { model }) if model == meta.name() => {}
        _ => {
            return Err(ModelError::config(format!(
                "field '{}' of model {}: model {} has no related model field '{}' pointing back to {}",
                field.name(),
                meta.name(),
                target,
                back_ref,
                meta.name()
            )));
        }
    }
    let pk = meta.primary_key().ok_or_else(|| {
        ModelError::config(format!(
            "field '{}': model {} has no primary key to resolve reverse relations with",
            field.name(),
            meta.name()
        ))
    })?;

    let keys = distinct(records.iter().filter_map(|r| r.get(pk)));
    let children = if keys.is_empty() {
        Vec::new()
    } else {
        manager
            .backend_for(&target_meta)?
            .read(&target_meta, &Where::is_in(back_ref, keys), &[], Page::unbounded())
            .await?
            .records
    };

    for (record, instance) in records.iter().zip(instances.iter_mut()) {
        let list = match record.get(pk) {
            Some(key) if !key.is_null() => children
                .iter()
                .filter(|c| c.get(back_ref).is_some_and(|v| values_equal(v, key)))
                .map(|c| hydrate(&target_meta, c, &[]))
                .collect(),
            _ => Vec::new(),
        };
        instance.set(field.name(), FieldValue::RelatedList(list));
    }
    Ok(())
}

fn target_primary_key<'m>(target: &'m ModelMeta, field: &Field) -> Result<&'m str> {
    target.primary_key().ok_or_else(|| {
        ModelError::config(format!(
            "field '{}' relates to model {}, which has no primary key",
            field.name(),
            target.name()
        ))
    })
}

/// Non-null values, first occurrence order, duplicates removed.
fn distinct<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for value in values {
        if !value.is_null() && !out.iter().any(|v| values_equal(v, value)) {
            out.push(value.clone());
        }
    }
    out
}
