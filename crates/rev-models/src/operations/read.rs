use super::{related, OperationKind, OperationResult, ReadMeta};
use crate::backend::Page;
use crate::error::{ModelError, Result};
use crate::fields::FieldKind;
use crate::manager::ModelManager;
use crate::model::{ModelInstance, ModelMeta, Record};
use crate::query::{OrderBy, Where};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Relation fields to resolve into related instances.
    pub related: Vec<String>,
    /// Forward relation fields to return as their raw foreign key.
    pub raw_values: Vec<String>,
    /// Sort keys: `"field"`, `"-field"`, `"field asc"` or `"field desc"`.
    pub order_by: Vec<String>,
    /// `None` uses the manager's default limit.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ReadOptions {
    pub fn related<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.related = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn raw_values<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.raw_values = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.order_by = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A complete read request in its JSON form:
///
/// ```json
/// {"where": {"name": {"_like": "J%"}}, "related": ["posts"],
///  "orderBy": ["-id"], "limit": 10, "offset": 0}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadQuery {
    #[serde(rename = "where")]
    pub where_: Value,
    pub related: Vec<String>,
    #[serde(alias = "raw_values")]
    pub raw_values: Vec<String>,
    #[serde(alias = "order_by")]
    pub order_by: Vec<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ReadQuery {
    pub fn into_parts(self) -> (Value, ReadOptions) {
        let options = ReadOptions {
            related: self.related,
            raw_values: self.raw_values,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
        };
        (self.where_, options)
    }
}

/// Reads one window of `model` records.
///
/// `where_` uses the JSON filter syntax of [`Where::parse`]; `null` or `{}`
/// matches every record. Forward relation fields are left out of each
/// instance unless named in `related` or `raw_values`.
pub async fn run(
    manager: &ModelManager,
    model: &str,
    where_: &Value,
    options: &ReadOptions,
) -> Result<OperationResult> {
    let meta = manager.meta(model)?;
    let filter = Where::parse(&meta, where_)?;
    let order_by = OrderBy::parse_all(&meta, &options.order_by)?;
    check_relation_options(&meta, options)?;

    let limit = options.limit.unwrap_or(manager.config().default_limit);
    let offset = options.offset.unwrap_or(0);

    debug!(model = meta.name(), operation = "read", stage = "executing", limit, offset);
    let page = manager
        .backend_for(&meta)?
        .read(&meta, &filter, &order_by, Page::new(limit, offset))
        .await?;

    let mut instances: Vec<ModelInstance> = page
        .records
        .iter()
        .map(|record| hydrate(&meta, record, &options.raw_values))
        .collect();

    if !options.related.is_empty() {
        debug!(model = meta.name(), operation = "read", stage = "resolving-relations");
        for field in &options.related {
            related::resolve(manager, &meta, field, &page.records, &mut instances).await?;
        }
    }

    let mut result = OperationResult::new(OperationKind::Read);
    result.results = Some(instances);
    result.meta = Some(ReadMeta {
        offset,
        limit,
        total_count: page.total_count,
        order_by: order_by.iter().map(OrderBy::to_spec).collect(),
    });
    debug!(
        model = meta.name(),
        operation = "read",
        stage = "complete",
        total_count = page.total_count
    );
    Ok(result)
}

/// Builds an instance from a stored record. Forward relation keys are only
/// copied for fields listed in `raw_values`.
pub(crate) fn hydrate(meta: &ModelMeta, record: &Record, raw_values: &[String]) -> ModelInstance {
    let mut instance = ModelInstance::new(meta.name());
    for field in meta.stored_fields() {
        let is_relation = matches!(field.kind(), FieldKind::RelatedModel { .. });
        if is_relation && !raw_values.iter().any(|r| r == field.name()) {
            continue;
        }
        if let Some(value) = record.get(field.name()) {
            instance.set(field.name(), value.clone());
        }
    }
    instance
}

fn check_relation_options(meta: &ModelMeta, options: &ReadOptions) -> Result<()> {
    for name in &options.related {
        match meta.field(name) {
            Some(field) if field.relation_target().is_some() => {}
            _ => {
                return Err(ModelError::query(format!(
                    "'{}' is not a relation field of model {}",
                    name,
                    meta.name()
                )));
            }
        }
        if options.raw_values.contains(name) {
            return Err(ModelError::query(format!(
                "field '{}' cannot be listed in both related and raw_values",
                name
            )));
        }
    }
    for name in &options.raw_values {
        match meta.field(name).map(|f| f.kind()) {
            Some(FieldKind::RelatedModel { .. }) => {}
            _ => {
                return Err(ModelError::query(format!(
                    "raw_values: '{}' is not a related model field of model {}",
                    name,
                    meta.name()
                )));
            }
        }
    }
    Ok(())
}
