//! Field validators.
//!
//! Built-in rules form a closed set of [`Validator`] variants dispatched
//! through [`Validator::validate`]. Application rules use
//! [`Validator::Custom`] (sync) or [`AsyncValidator`] (async).
//!
//! Every validator except `Required` ignores a missing or null value, so a
//! field reports "required" once instead of once per rule.

use super::result::{FieldError, ValidationResult};
use crate::fields::{Field, FieldKind};
use crate::model::{FieldValue, ModelInstance, ModelMeta};
use crate::operations::OperationKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Everything a validator may look at. Validators never mutate the instance.
pub struct ValidationContext<'a> {
    pub instance: &'a ModelInstance,
    pub field: &'a Field,
    pub meta: &'a ModelMeta,
    pub operation: OperationKind,
}

impl<'a> ValidationContext<'a> {
    pub fn field_value(&self) -> Option<&'a FieldValue> {
        self.instance.get(self.field.name())
    }

    fn present(&self) -> Present<'a> {
        match self.field_value() {
            None => Present::Missing,
            Some(v) if v.is_missing() => Present::Missing,
            Some(FieldValue::Value(v)) => Present::Scalar(v),
            Some(_) => Present::Relation,
        }
    }
}

enum Present<'a> {
    Missing,
    Scalar(&'a Value),
    Relation,
}

type CustomCheck = dyn Fn(&ValidationContext<'_>) -> Option<String> + Send + Sync;

#[derive(Clone)]
pub enum Validator {
    Required,
    NotEmpty,
    Text,
    MinLength(usize),
    MaxLength(usize),
    Email,
    Integer,
    Number,
    Boolean,
    MinValue(f64),
    MaxValue(f64),
    Selection(Vec<String>),
    MultiSelection(Vec<String>),
    Date,
    Time,
    DateTime,
    RelatedModel,
    /// Application rule; `name` doubles as the error code.
    Custom { name: String, check: Arc<CustomCheck> },
}

impl Validator {
    pub fn custom<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ValidationContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        Validator::Custom {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Error code this validator reports.
    pub fn code(&self) -> &str {
        match self {
            Validator::Required => "required",
            Validator::NotEmpty => "string_empty",
            Validator::Text => "not_a_string",
            Validator::MinLength(_) => "min_string_length",
            Validator::MaxLength(_) => "max_string_length",
            Validator::Email => "not_an_email",
            Validator::Integer => "not_an_integer",
            Validator::Number => "not_a_number",
            Validator::Boolean => "not_a_boolean",
            Validator::MinValue(_) => "min_value",
            Validator::MaxValue(_) => "max_value",
            Validator::Selection(_) | Validator::MultiSelection(_) => "no_selection",
            Validator::Date => "not_a_date",
            Validator::Time => "not_a_time",
            Validator::DateTime => "not_a_datetime",
            Validator::RelatedModel => "invalid_related_value",
            Validator::Custom { name, .. } => name,
        }
    }

    /// Runs the rule, appending at most one error for the context's field.
    pub fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
        if let Some(message) = self.check(ctx) {
            result.add_field_error(ctx.field.name(), FieldError::new(self.code(), message));
        }
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        if let Validator::Custom { check, .. } = self {
            return check(ctx);
        }
        let value = match ctx.present() {
            Present::Missing => {
                return matches!(self, Validator::Required)
                    .then(|| "This field is required".to_string());
            }
            Present::Relation => {
                return self.check_relation_value(ctx);
            }
            Present::Scalar(value) => value,
        };

        let ok = match self {
            Validator::Required | Validator::Custom { .. } => true,
            Validator::NotEmpty => value.as_str() != Some(""),
            Validator::Text => value.is_string(),
            Validator::MinLength(min) => value.as_str().map_or(true, |s| s.chars().count() >= *min),
            Validator::MaxLength(max) => value.as_str().map_or(true, |s| s.chars().count() <= *max),
            Validator::Email => value.as_str().map_or(true, is_email),
            Validator::Integer => is_integer(value),
            Validator::Number => value.is_number(),
            Validator::Boolean => value.is_boolean(),
            Validator::MinValue(min) => value.as_f64().map_or(true, |n| n >= *min),
            Validator::MaxValue(max) => value.as_f64().map_or(true, |n| n <= *max),
            Validator::Selection(keys) => value
                .as_str()
                .is_some_and(|s| keys.iter().any(|k| k == s)),
            Validator::MultiSelection(keys) => value.as_array().is_some_and(|items| {
                items
                    .iter()
                    .all(|item| item.as_str().is_some_and(|s| keys.iter().any(|k| k == s)))
            }),
            Validator::Date => value.as_str().is_some_and(is_date),
            Validator::Time => value.as_str().is_some_and(is_time),
            Validator::DateTime => value.as_str().is_some_and(is_datetime),
            Validator::RelatedModel => value.is_number() || value.is_string(),
        };

        (!ok).then(|| self.message(ctx))
    }

    /// A resolved relation value only satisfies the relation rule, and only
    /// when it is an instance of the field's target model.
    fn check_relation_value(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        match self {
            Validator::Required => None,
            Validator::RelatedModel => {
                let target = ctx.field.relation_target().unwrap_or_default();
                match ctx.field_value() {
                    Some(FieldValue::Related(Some(instance))) if instance.model() == target => {
                        None
                    }
                    _ => Some(self.message(ctx)),
                }
            }
            _ => Some(self.message(ctx)),
        }
    }

    fn message(&self, ctx: &ValidationContext<'_>) -> String {
        match self {
            Validator::Required => "This field is required".to_string(),
            Validator::NotEmpty => "This field must not be empty".to_string(),
            Validator::Text => "Not a valid string".to_string(),
            Validator::MinLength(min) => format!("Must be at least {} characters", min),
            Validator::MaxLength(max) => format!("Must not be more than {} characters", max),
            Validator::Email => "Not a valid email address".to_string(),
            Validator::Integer => "Not a valid integer".to_string(),
            Validator::Number => "Not a valid number".to_string(),
            Validator::Boolean => "Value must be true or false".to_string(),
            Validator::MinValue(min) => format!("Must be at least {}", min),
            Validator::MaxValue(max) => format!("Must not be more than {}", max),
            Validator::Selection(_) | Validator::MultiSelection(_) => {
                "Selected value is not valid".to_string()
            }
            Validator::Date => "Not a valid date (expected YYYY-MM-DD)".to_string(),
            Validator::Time => "Not a valid time (expected HH:MM:SS)".to_string(),
            Validator::DateTime => "Not a valid date and time (expected ISO 8601)".to_string(),
            Validator::RelatedModel => match ctx.field.kind() {
                FieldKind::RelatedModel { model } => {
                    format!("Value must be a primary key or a {} instance", model)
                }
                _ => "Not a valid related value".to_string(),
            },
            Validator::Custom { name, .. } => format!("Failed validation '{}'", name),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
            Validator::MinLength(n) => f.debug_tuple("MinLength").field(n).finish(),
            Validator::MaxLength(n) => f.debug_tuple("MaxLength").field(n).finish(),
            Validator::MinValue(n) => f.debug_tuple("MinValue").field(n).finish(),
            Validator::MaxValue(n) => f.debug_tuple("MaxValue").field(n).finish(),
            Validator::Selection(keys) => f.debug_tuple("Selection").field(keys).finish(),
            Validator::MultiSelection(keys) => f.debug_tuple("MultiSelection").field(keys).finish(),
            other => f.write_str(other.code()),
        }
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|n| n.fract() == 0.0)
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_time(s: &str) -> bool {
    NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
}

fn is_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
}

/// Structural address check: `local@domain.tld`, no whitespace, one `@`.
fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || s.chars().any(char::is_whitespace) {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return false;
    }
    domain.contains('.')
}

// --- Async validators ---

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Owned input handed to an async validator; it may outlive the call that
/// spawned it when validation times out.
#[derive(Debug, Clone)]
pub struct AsyncValidationInput {
    pub instance: ModelInstance,
    pub model: String,
    pub field: String,
    pub operation: OperationKind,
}

type AsyncCheck = dyn Fn(AsyncValidationInput) -> BoxFuture<Option<String>> + Send + Sync;

/// An asynchronous field rule. The future resolves to an error message, or
/// `None` when the value passes.
#[derive(Clone)]
pub struct AsyncValidator {
    name: String,
    check: Arc<AsyncCheck>,
}

impl AsyncValidator {
    pub fn new<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(AsyncValidationInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(move |input| Box::pin(check(input))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self, input: AsyncValidationInput) -> BoxFuture<Option<String>> {
        (self.check)(input)
    }
}

impl fmt::Debug for AsyncValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
