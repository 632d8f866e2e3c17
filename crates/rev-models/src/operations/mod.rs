//! # Operation Pipeline
//!
//! Each CRUD verb lives in its own submodule and runs the same stages:
//!
//! ```text
//! validating ──► executing ──► resolving-relations ──► complete
//!     │              │
//!     ▼              ▼
//!   failed         failed
//! ```
//!
//! - **validating**: `create`/`update` run the validation engine. An invalid
//!   instance ends the operation with `success = false` and a
//!   `validation_failed` error; the backend is not called.
//! - **executing**: the model's backend performs the call. An update or
//!   remove aimed at one instance (by primary key) that matches nothing ends
//!   with a `not_found` error.
//! - **resolving-relations**: `read` replaces foreign keys with related
//!   instances for each field named in `related`, one batched read per field.
//!
//! ## Error Policy
//!
//! Expected outcomes are encoded in [`OperationResult`]; callers branch on
//! `success` before using `result`/`results`. Setup mistakes (unknown model,
//! bad query, unregistered relation target), validation timeouts and
//! backend faults are returned as `Err(ModelError)`.
//!
//! ## Modules
//!
//! - [`create`]: validate and store a new instance
//! - [`read`]: filter, order, page and resolve relations
//! - [`update`]: validate and apply field changes to matching records
//! - [`remove`]: delete matching records
//! - [`validate`]: run validation without touching the backend
//! - `related`: batched relation resolution for `read`

use crate::error::{ModelError, Result};
use crate::manager::ModelManager;
use crate::model::{FieldValue, ModelInstance, ModelMeta, Record};
use crate::validation::{ValidationOptions, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

pub mod create;
pub mod read;
mod related;
pub mod remove;
pub mod update;
pub mod validate;

pub use read::{ReadOptions, ReadQuery};
pub use validate::ValidateOptions;

/// Which CRUD verb is running; validators may branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::Update => "update",
            OperationKind::Remove => "remove",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationErrorCode {
    ValidationFailed,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationError {
    pub code: OperationErrorCode,
    pub message: String,
}

impl OperationError {
    pub fn validation_failed() -> Self {
        Self {
            code: OperationErrorCode::ValidationFailed,
            message: "Model failed validation".to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: OperationErrorCode::NotFound,
            message: message.into(),
        }
    }
}

/// Window and ordering actually applied by a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadMeta {
    pub offset: usize,
    pub limit: usize,
    pub total_count: usize,
    pub order_by: Vec<String>,
}

/// Outcome of one operation.
///
/// - `create`/`update`: `result` holds the single instance.
/// - `read`: `results` holds the window, `meta` describes it.
/// - `update`/`remove`: `affected` counts matched records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub operation: OperationKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ModelInstance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ModelInstance>>,
    pub errors: Vec<OperationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ReadMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<usize>,
}

impl OperationResult {
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            success: true,
            result: None,
            results: None,
            errors: Vec::new(),
            validation: None,
            meta: None,
            affected: None,
        }
    }

    pub fn add_error(&mut self, error: OperationError) {
        self.success = false;
        self.errors.push(error);
    }

    pub(crate) fn validation_failed(operation: OperationKind, validation: ValidationResult) -> Self {
        let mut result = Self::new(operation);
        result.validation = Some(validation);
        result.add_error(OperationError::validation_failed());
        result
    }

    pub fn has_error(&self, code: OperationErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

// --- Options ---

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Async validation timeout; `None` uses the manager config.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Records to update; `None` targets the instance's primary key.
    pub where_: Option<Value>,
    /// Only validate and apply these fields.
    pub fields: Option<Vec<String>>,
    pub timeout: Option<Duration>,
}

impl UpdateOptions {
    pub fn filter(mut self, where_: Value) -> Self {
        self.where_ = Some(where_);
        self
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

// --- Shared pipeline helpers ---

pub(crate) fn validation_options(
    manager: &ModelManager,
    fields: Option<Vec<String>>,
    timeout: Option<Duration>,
) -> ValidationOptions {
    ValidationOptions {
        fields,
        timeout: Some(timeout.unwrap_or_else(|| manager.config().validation_timeout())),
    }
}

/// Converts the stored fields of an instance into a backend record,
/// replacing related instances with their primary key. Fields the instance
/// does not set are left out.
pub(crate) fn to_record(
    manager: &ModelManager,
    meta: &ModelMeta,
    instance: &ModelInstance,
    only: Option<&[String]>,
) -> Result<Record> {
    let mut record = Record::new();
    for field in meta.stored_fields() {
        if only.is_some_and(|names| !names.iter().any(|n| n == field.name())) {
            continue;
        }
        let Some(value) = instance.get(field.name()) else {
            continue;
        };
        let value = match value {
            FieldValue::Value(v) => v.clone(),
            FieldValue::Related(None) => Value::Null,
            FieldValue::Related(Some(related)) => related_key(manager, field.name(), related)?,
            FieldValue::RelatedList(_) => {
                return Err(ModelError::config(format!(
                    "field '{}' of model {} cannot store a list of instances",
                    field.name(),
                    meta.name()
                )));
            }
        };
        record.insert(field.name().to_string(), value);
    }
    Ok(record)
}

fn related_key(manager: &ModelManager, field: &str, related: &ModelInstance) -> Result<Value> {
    let target = manager.meta(related.model())?;
    let pk = target.primary_key().ok_or_else(|| {
        ModelError::config(format!(
            "model {} has no primary key, so it cannot be referenced by '{}'",
            target.name(),
            field
        ))
    })?;
    match related.value(pk) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => Err(ModelError::config(format!(
            "the {} instance assigned to '{}' has no primary key value",
            target.name(),
            field
        ))),
    }
}

/// Primary-key value of `instance`, used when an update or remove targets it.
pub(crate) fn primary_key_value<'i>(
    meta: &ModelMeta,
    instance: &'i ModelInstance,
    verb: OperationKind,
) -> Result<(&'i Value, String)> {
    let pk = meta.primary_key().ok_or_else(|| {
        ModelError::config(format!(
            "{} of a {} instance needs a where clause because the model has no primary key",
            verb,
            meta.name()
        ))
    })?;
    match instance.value(pk) {
        Some(value) if !value.is_null() => Ok((value, pk.to_string())),
        _ => Err(ModelError::config(format!(
            "{} needs a where clause or a value for primary key '{}'",
            verb, pk
        ))),
    }
}
