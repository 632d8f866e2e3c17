use super::compare_values;
use crate::error::{ModelError, Result};
use crate::model::{ModelMeta, Record};
use serde_json::Value;
use std::cmp::Ordering;

/// One sort key of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Accepts `"name"`, `"-name"` (descending), `"name asc"` and `"name desc"`.
    pub fn parse(meta: &ModelMeta, spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (field, descending) = if let Some(field) = spec.strip_prefix('-') {
            (field, true)
        } else {
            match spec.split_once(char::is_whitespace) {
                None => (spec, false),
                Some((field, direction)) => match direction.trim().to_ascii_lowercase().as_str() {
                    "asc" => (field, false),
                    "desc" => (field, true),
                    other => {
                        return Err(ModelError::query(format!(
                            "invalid sort direction '{}' for field '{}'",
                            other, field
                        )));
                    }
                },
            }
        };

        match meta.field(field) {
            Some(f) if f.is_stored() => Ok(Self {
                field: field.to_string(),
                descending,
            }),
            _ => Err(ModelError::query(format!(
                "cannot order model {} by '{}'",
                meta.name(),
                field
            ))),
        }
    }

    pub fn parse_all<S: AsRef<str>>(meta: &ModelMeta, specs: &[S]) -> Result<Vec<Self>> {
        specs.iter().map(|s| Self::parse(meta, s.as_ref())).collect()
    }

    /// Canonical string form, `"-field"` for descending keys.
    pub fn to_spec(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.clone()
        }
    }
}

/// Stable multi-key sort; ties keep insertion order.
pub fn sort_records(records: &mut [Record], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for key in order_by {
            let ordering = sort_key_cmp(
                a.get(&key.field).unwrap_or(&Value::Null),
                b.get(&key.field).unwrap_or(&Value::Null),
            );
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Total order for sorting: null < bool < number < string < everything else.
fn sort_key_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }
    rank(a)
        .cmp(&rank(b))
        .then_with(|| compare_values(a, b).unwrap_or(Ordering::Equal))
}
