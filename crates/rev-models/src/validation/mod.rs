//! # Validation Engine
//!
//! [`validate`] checks a candidate [`ModelInstance`] against its
//! [`ModelMeta`] for a given operation:
//!
//! 1. Values for names the model does not declare add an `extra_field`
//!    model error.
//! 2. Every in-scope field's synchronous validators run in declaration order.
//! 3. Model-level validators run.
//! 4. Every in-scope field's async validators are spawned together and
//!    awaited as a group under a timeout (default 5000 ms).
//!
//! ## Field Scope
//!
//! - `create` validates every stored field.
//! - `update` validates only the fields listed in
//!   [`ValidationOptions::fields`], or when that is absent, the fields present
//!   on the instance. A partial update therefore never fails "required" for a
//!   field it does not touch, but explicitly clearing a required field does.
//!
//! ## Timeouts
//!
//! If the async validators have not all settled in time, the call fails with
//! [`ModelError::ValidationTimeout`] and any async errors already collected
//! are discarded. The validator tasks are detached, not cancelled.

mod result;
mod validators;

pub use result::{FieldError, ModelValidationError, ValidationResult};
pub use validators::{AsyncValidationInput, AsyncValidator, BoxFuture, ValidationContext, Validator};

use crate::config::DEFAULT_VALIDATION_TIMEOUT_MS;
use crate::error::{ModelError, Result};
use crate::fields::Field;
use crate::model::{ModelInstance, ModelMeta};
use crate::operations::OperationKind;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Restricts `update` validation to these fields.
    pub fields: Option<Vec<String>>,
    /// Async validator timeout; `None` uses 5000 ms.
    pub timeout: Option<Duration>,
}

impl ValidationOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    fn timeout(&self) -> Duration {
        self.timeout
            .unwrap_or(Duration::from_millis(DEFAULT_VALIDATION_TIMEOUT_MS))
    }
}

pub async fn validate(
    instance: &ModelInstance,
    meta: &ModelMeta,
    operation: OperationKind,
    options: &ValidationOptions,
) -> Result<ValidationResult> {
    if instance.model() != meta.name() {
        return Err(ModelError::config(format!(
            "cannot validate a '{}' instance against model '{}'",
            instance.model(),
            meta.name()
        )));
    }

    let mut result = ValidationResult::new();

    for name in instance.field_names() {
        if !meta.has_field(name) {
            result.add_model_error(
                "extra_field",
                format!("Field '{}' does not exist in model {}", name, meta.name()),
            );
        }
    }

    let fields = fields_in_scope(instance, meta, operation, options)?;

    for field in &fields {
        let ctx = ValidationContext {
            instance,
            field,
            meta,
            operation,
        };
        for validator in field.validators() {
            validator.validate(&ctx, &mut result);
        }
    }

    for validator in meta.model_validators() {
        if let Some(error) = validator.run(instance, operation) {
            result.add_model_validation_error(error);
        }
    }

    run_async_validators(instance, meta, &fields, operation, options.timeout(), &mut result)
        .await?;

    tracing::debug!(
        model = meta.name(),
        operation = %operation,
        valid = result.valid,
        "validated instance"
    );
    Ok(result)
}

fn fields_in_scope<'m>(
    instance: &ModelInstance,
    meta: &'m ModelMeta,
    operation: OperationKind,
    options: &ValidationOptions,
) -> Result<Vec<&'m Field>> {
    if operation != OperationKind::Update {
        return Ok(meta.stored_fields().collect());
    }
    match &options.fields {
        Some(names) => names
            .iter()
            .map(|name| {
                meta.field(name).ok_or_else(|| {
                    ModelError::query(format!(
                        "field '{}' does not exist in model {}",
                        name,
                        meta.name()
                    ))
                })
            })
            .filter(|field| field.as_ref().map_or(true, |f| f.is_stored()))
            .collect(),
        None => Ok(meta
            .stored_fields()
            .filter(|f| instance.contains(f.name()))
            .collect()),
    }
}

async fn run_async_validators(
    instance: &ModelInstance,
    meta: &ModelMeta,
    fields: &[&Field],
    operation: OperationKind,
    timeout: Duration,
    result: &mut ValidationResult,
) -> Result<()> {
    let mut pending: Vec<(String, String, JoinHandle<Option<String>>)> = Vec::new();
    for field in fields {
        for validator in field.async_validators() {
            let input = AsyncValidationInput {
                instance: instance.clone(),
                model: meta.name().to_string(),
                field: field.name().to_string(),
                operation,
            };
            let handle = tokio::spawn(validator.start(input));
            pending.push((field.name().to_string(), validator.name().to_string(), handle));
        }
    }
    if pending.is_empty() {
        return Ok(());
    }

    let settle = async move {
        let mut errors = Vec::new();
        for (field, code, handle) in pending {
            let outcome = handle.await.map_err(|e| {
                ModelError::Validator(format!("async validator '{}' on '{}' failed: {}", code, field, e))
            })?;
            if let Some(message) = outcome {
                errors.push((field, FieldError::new(code, message)));
            }
        }
        Ok::<_, ModelError>(errors)
    };

    match tokio::time::timeout(timeout, settle).await {
        Ok(errors) => {
            for (field, error) in errors? {
                result.add_field_error(field, error);
            }
            Ok(())
        }
        Err(_) => {
            tracing::warn!(
                model = meta.name(),
                timeout_ms = timeout.as_millis() as u64,
                "async validation timed out"
            );
            Err(ModelError::ValidationTimeout {
                model: meta.name().to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}
