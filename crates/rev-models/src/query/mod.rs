//! # Queries
//!
//! Filtering ([`Where`]) and ordering ([`OrderBy`]) of stored records. Both
//! are parsed against a model's metadata, so a query naming an unknown field
//! fails with [`crate::error::ModelError::Query`] before reaching a backend.

mod filter;
mod order;

pub use filter::{Condition, Where};
pub use order::{sort_records, OrderBy};

pub(crate) use filter::values_equal;

use serde_json::Value;
use std::cmp::Ordering;

/// Ordering between two values of the same comparable kind. Numbers compare
/// numerically, strings lexicographically, booleans false-first; anything
/// else is incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compares_like_kinds() {
        assert_eq!(compare_values(&json!(1), &json!(2.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!(true), &json!(false)), Some(Ordering::Greater));
    }

    #[test]
    fn mixed_kinds_are_incomparable() {
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
        assert_eq!(compare_values(&json!(null), &json!(0)), None);
    }
}
