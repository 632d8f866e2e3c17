//! Record filtering.
//!
//! A [`Where`] clause is parsed from the JSON shape used by read, update and
//! remove calls:
//!
//! ```text
//! { "name": "Fred" }                         equality shorthand
//! { "age": { "_gte": 18, "_lt": 65 } }       several operators are ANDed
//! { "user": { "_null": true } }              null check
//! { "_or": [ { "id": 1 }, { "id": 2 } ] }    boolean combinators
//! ```
//!
//! Operators: `_eq`, `_ne`, `_gt`, `_gte`, `_lt`, `_lte`, `_in`, `_nin`,
//! `_like`, `_null`. Combinators: `_and`, `_or`. Each may also be spelled
//! with a `$` prefix instead (`{ "developer": { "$eq": null } }`).

use super::compare_values;
use crate::error::{ModelError, Result};
use crate::model::{ModelMeta, Record};
use serde_json::Value;
use std::cmp::Ordering;

/// A comparison applied to one field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    /// SQL-style pattern: `%` matches any run, `_` matches one character.
    Like(String),
    /// `true` matches null or missing values, `false` matches everything else.
    Null(bool),
}

impl Condition {
    /// Check a record value against this condition. Missing values are null.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.unwrap_or(&Value::Null);
        match self {
            Condition::Eq(expected) => values_equal(value, expected),
            Condition::Ne(expected) => !values_equal(value, expected),
            Condition::Gt(bound) => compare_values(value, bound) == Some(Ordering::Greater),
            Condition::Gte(bound) => matches!(
                compare_values(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(bound) => compare_values(value, bound) == Some(Ordering::Less),
            Condition::Lte(bound) => matches!(
                compare_values(value, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::In(options) => options.iter().any(|o| values_equal(value, o)),
            Condition::Nin(options) => !options.iter().any(|o| values_equal(value, o)),
            Condition::Like(pattern) => value.as_str().is_some_and(|s| like(s, pattern)),
            Condition::Null(is_null) => value.is_null() == *is_null,
        }
    }

    fn parse(op: &str, operand: &Value) -> Result<Self> {
        let condition = match operator_name(op) {
            Some("eq") => Condition::Eq(operand.clone()),
            Some("ne") => Condition::Ne(operand.clone()),
            Some("gt") => Condition::Gt(comparable(op, operand)?),
            Some("gte") => Condition::Gte(comparable(op, operand)?),
            Some("lt") => Condition::Lt(comparable(op, operand)?),
            Some("lte") => Condition::Lte(comparable(op, operand)?),
            Some("in") => Condition::In(list(op, operand)?),
            Some("nin") => Condition::Nin(list(op, operand)?),
            Some("like") => Condition::Like(
                operand
                    .as_str()
                    .ok_or_else(|| ModelError::query(format!("'{}' expects a string", op)))?
                    .to_string(),
            ),
            Some("null") => Condition::Null(
                operand
                    .as_bool()
                    .ok_or_else(|| {
                        ModelError::query(format!("'{}' expects true or false", op))
                    })?,
            ),
            _ => {
                return Err(ModelError::query(format!("unrecognised operator '{}'", op)));
            }
        };
        Ok(condition)
    }
}

/// A filter over the records of one model.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    Field { field: String, condition: Condition },
    And(Vec<Where>),
    Or(Vec<Where>),
}

impl Default for Where {
    fn default() -> Self {
        Self::all()
    }
}

impl Where {
    /// Matches every record.
    pub fn all() -> Self {
        Where::And(Vec::new())
    }

    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        Where::Field {
            field: field.into(),
            condition,
        }
    }

    /// Convenience: create an equality filter.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::field(field, Condition::Eq(value))
    }

    /// Convenience: create a set-membership filter.
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::field(field, Condition::In(values))
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Where::And(clauses) if clauses.is_empty())
    }

    /// Parses the JSON query shape, checking field names against `meta`.
    /// `null` and `{}` match everything.
    pub fn parse(meta: &ModelMeta, json: &Value) -> Result<Self> {
        match json {
            Value::Null => Ok(Self::all()),
            Value::Object(map) => {
                let mut clauses = Vec::with_capacity(map.len());
                for (key, value) in map {
                    let clause = match operator_name(key) {
                        Some("and") => Where::And(Self::parse_list(meta, key, value)?),
                        Some("or") => Where::Or(Self::parse_list(meta, key, value)?),
                        _ => Self::parse_field(meta, key, value)?,
                    };
                    clauses.push(clause);
                }
                Ok(collapse(clauses))
            }
            _ => Err(ModelError::query("the where clause must be an object")),
        }
    }

    fn parse_list(meta: &ModelMeta, key: &str, value: &Value) -> Result<Vec<Where>> {
        let items = value
            .as_array()
            .ok_or_else(|| ModelError::query(format!("'{}' expects a list of where clauses", key)))?;
        items.iter().map(|item| Self::parse(meta, item)).collect()
    }

    fn parse_field(meta: &ModelMeta, name: &str, value: &Value) -> Result<Where> {
        let field = meta.field(name).ok_or_else(|| {
            ModelError::query(format!("field '{}' does not exist in model {}", name, meta.name()))
        })?;
        if !field.is_stored() {
            return Err(ModelError::query(format!(
                "field '{}' of model {} cannot be filtered on",
                name,
                meta.name()
            )));
        }

        let Value::Object(ops) = value else {
            return Ok(Where::eq(name, value.clone()));
        };
        if ops.is_empty() {
            return Err(ModelError::query(format!("no operators given for field '{}'", name)));
        }
        let clauses = ops
            .iter()
            .map(|(op, operand)| Ok(Where::field(name, Condition::parse(op, operand)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(collapse(clauses))
    }

    /// Check if this filter matches the given record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Where::Field { field, condition } => condition.matches(record.get(field)),
            Where::And(clauses) => clauses.iter().all(|c| c.matches(record)),
            Where::Or(clauses) => clauses.iter().any(|c| c.matches(record)),
        }
    }
}

fn collapse(mut clauses: Vec<Where>) -> Where {
    if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        Where::And(clauses)
    }
}

/// Operators and combinators are spelled with a `_` or a `$` prefix.
fn operator_name(key: &str) -> Option<&str> {
    key.strip_prefix('_').or_else(|| key.strip_prefix('$'))
}

fn comparable(op: &str, operand: &Value) -> Result<Value> {
    if operand.is_number() || operand.is_string() {
        Ok(operand.clone())
    } else {
        Err(ModelError::query(format!("'{}' expects a number or a string", op)))
    }
}

fn list(op: &str, operand: &Value) -> Result<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| ModelError::query(format!("'{}' expects a list", op)))
}

/// Equality with numbers compared by value, so `1` equals `1.0`.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Wildcard match that backtracks only to the most recent `%`.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    // Last `%` seen, and the text position it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                star = Some((p, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    star = Some((star_p, star_t + 1));
                    p = star_p + 1;
                    t = star_t + 1;
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;
    use serde_json::json;

    fn meta() -> ModelMeta {
        ModelMeta::builder("User")
            .field(Field::auto_number("id").primary_key())
            .field(Field::text("name"))
            .field(Field::integer("age"))
            .field(Field::related_model("company", "Company").optional())
            .field(Field::related_model_list("posts", "Post", "user"))
            .build()
            .unwrap()
    }

    fn record(json: Value) -> Record {
        match json {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn parse(json: Value) -> Where {
        Where::parse(&meta(), &json).unwrap()
    }

    #[test]
    fn empty_where_matches_everything() {
        assert!(parse(json!({})).is_match_all());
        assert!(parse(Value::Null).is_match_all());
        assert!(Where::all().matches(&record(json!({"id": 1}))));
    }

    #[test]
    fn literal_is_equality() {
        let filter = parse(json!({"name": "Fred"}));
        assert_eq!(filter, Where::eq("name", json!("Fred")));
        assert!(filter.matches(&record(json!({"name": "Fred"}))));
        assert!(!filter.matches(&record(json!({"name": "Wilma"}))));
    }

    #[test]
    fn numeric_equality_ignores_representation() {
        let filter = parse(json!({"age": 30}));
        assert!(filter.matches(&record(json!({"age": 30.0}))));
    }

    #[test]
    fn comparison_operators() {
        let adult = parse(json!({"age": {"_gte": 18, "_lt": 65}}));
        assert!(adult.matches(&record(json!({"age": 18}))));
        assert!(adult.matches(&record(json!({"age": 64}))));
        assert!(!adult.matches(&record(json!({"age": 65}))));
        assert!(!adult.matches(&record(json!({"age": 3}))));
        assert!(!adult.matches(&record(json!({"age": "old"}))));

        let after = parse(json!({"name": {"_gt": "M"}}));
        assert!(after.matches(&record(json!({"name": "Wilma"}))));
        assert!(!after.matches(&record(json!({"name": "Fred"}))));
    }

    #[test]
    fn ne_and_set_operators() {
        let ne = parse(json!({"name": {"_ne": "Fred"}}));
        assert!(ne.matches(&record(json!({"name": "Wilma"}))));
        assert!(!ne.matches(&record(json!({"name": "Fred"}))));

        let within = parse(json!({"id": {"_in": [1, 3]}}));
        assert!(within.matches(&record(json!({"id": 3}))));
        assert!(!within.matches(&record(json!({"id": 2}))));

        let outside = parse(json!({"id": {"_nin": [1, 3]}}));
        assert!(outside.matches(&record(json!({"id": 2}))));
    }

    #[test]
    fn null_checks() {
        let no_company = parse(json!({"company": {"_null": true}}));
        assert!(no_company.matches(&record(json!({"company": null}))));
        assert!(no_company.matches(&record(json!({"id": 1}))));
        assert!(!no_company.matches(&record(json!({"company": 4}))));

        let eq_null = parse(json!({"company": {"_eq": null}}));
        assert!(eq_null.matches(&record(json!({"id": 1}))));

        let has_company = parse(json!({"company": {"_null": false}}));
        assert!(has_company.matches(&record(json!({"company": 4}))));
    }

    #[test]
    fn like_patterns() {
        let filter = parse(json!({"name": {"_like": "F%d"}}));
        assert!(filter.matches(&record(json!({"name": "Fred"}))));
        assert!(filter.matches(&record(json!({"name": "Fd"}))));
        assert!(!filter.matches(&record(json!({"name": "Freda"}))));

        let single = parse(json!({"name": {"_like": "B_b"}}));
        assert!(single.matches(&record(json!({"name": "Bob"}))));
        assert!(!single.matches(&record(json!({"name": "Boob"}))));
    }

    #[test]
    fn like_with_many_wildcards_fails_fast() {
        let pattern = format!("{}%b", "%a".repeat(12));
        let filter = parse(json!({"name": {"_like": pattern}}));
        let started = std::time::Instant::now();
        assert!(!filter.matches(&record(json!({"name": "a".repeat(36)}))));
        assert!(filter.matches(&record(json!({"name": format!("{}b", "a".repeat(36))}))));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn like_handles_long_literal_patterns() {
        let long = "x".repeat(200_000);
        let filter = parse(json!({"name": {"_like": long.clone()}}));
        assert!(filter.matches(&record(json!({"name": long}))));
    }

    #[test]
    fn like_edge_cases() {
        assert!(like("", ""));
        assert!(like("", "%%"));
        assert!(!like("", "_"));
        assert!(like("abc", "%"));
        assert!(like("abcabd", "%ab_"));
        assert!(!like("abcabe", "%abd"));
        assert!(like("mississippi", "m%iss%ppi"));
    }

    #[test]
    fn dollar_prefixed_operators() {
        let no_company = parse(json!({"company": {"$eq": null}}));
        assert_eq!(no_company, Where::eq("company", Value::Null));
        assert!(no_company.matches(&record(json!({"id": 1}))));

        let filter = parse(json!({"$or": [{"age": {"$gte": 60}}, {"name": {"$like": "F%"}}]}));
        assert!(filter.matches(&record(json!({"name": "Fred", "age": 30}))));
        assert!(filter.matches(&record(json!({"name": "Old", "age": 70}))));
        assert!(!filter.matches(&record(json!({"name": "Young", "age": 20}))));

        let within = parse(json!({"id": {"$in": [1, 2], "$ne": 2}}));
        assert!(within.matches(&record(json!({"id": 1}))));
        assert!(!within.matches(&record(json!({"id": 2}))));

        assert!(Where::parse(&meta(), &json!({"id": {"$between": [1, 2]}})).is_err());
    }

    #[test]
    fn and_or_combinators() {
        let filter = parse(json!({"_or": [{"name": "Fred"}, {"age": {"_gt": 60}}]}));
        assert!(filter.matches(&record(json!({"name": "Fred", "age": 30}))));
        assert!(filter.matches(&record(json!({"name": "Old", "age": 70}))));
        assert!(!filter.matches(&record(json!({"name": "Young", "age": 20}))));

        let both = parse(json!({"_and": [{"name": "Fred"}, {"age": 30}]}));
        assert!(both.matches(&record(json!({"name": "Fred", "age": 30}))));
        assert!(!both.matches(&record(json!({"name": "Fred", "age": 31}))));
    }

    #[test]
    fn rejects_unknown_fields_and_operators() {
        let meta = meta();
        assert!(matches!(
            Where::parse(&meta, &json!({"nope": 1})),
            Err(ModelError::Query(_))
        ));
        assert!(Where::parse(&meta, &json!({"age": {"_between": [1, 2]}})).is_err());
        assert!(Where::parse(&meta, &json!({"age": {}})).is_err());
        assert!(Where::parse(&meta, &json!({"id": {"_in": 3}})).is_err());
        assert!(Where::parse(&meta, &json!({"age": {"_gt": true}})).is_err());
        assert!(Where::parse(&meta, &json!({"_or": {"id": 1}})).is_err());
        assert!(Where::parse(&meta, &json!([1])).is_err());
    }

    #[test]
    fn reverse_relations_are_not_filterable() {
        assert!(Where::parse(&meta(), &json!({"posts": 1})).is_err());
    }
}
