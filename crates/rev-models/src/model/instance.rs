//! Model instances and backend records.
//!
//! Backends store plain [`Record`]s (field name to JSON value). The operation
//! pipeline hydrates records into [`ModelInstance`]s, where relation fields
//! can additionally hold resolved related instances.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A stored record: field name to raw JSON value, in field declaration order.
pub type Record = Map<String, Value>;

/// The value held by one field of a [`ModelInstance`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A scalar, including the raw foreign key of a relation field.
    Value(Value),
    /// A resolved forward relation (`None` when the key matched nothing).
    Related(Option<Box<ModelInstance>>),
    /// A resolved reverse relation.
    RelatedList(Vec<ModelInstance>),
}

impl FieldValue {
    /// True for values that count as "not set" for the required check.
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Value(Value::Null) | FieldValue::Related(None))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_related(&self) -> Option<&ModelInstance> {
        match self {
            FieldValue::Related(Some(instance)) => Some(instance),
            _ => None,
        }
    }

    pub fn as_related_list(&self) -> Option<&[ModelInstance]> {
        match self {
            FieldValue::RelatedList(list) => Some(list),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Value(v) => v.clone(),
            FieldValue::Related(Some(instance)) => instance.to_json(),
            FieldValue::Related(None) => Value::Null,
            FieldValue::RelatedList(list) => {
                Value::Array(list.iter().map(ModelInstance::to_json).collect())
            }
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<ModelInstance> for FieldValue {
    fn from(instance: ModelInstance) -> Self {
        FieldValue::Related(Some(Box::new(instance)))
    }
}

impl From<Vec<ModelInstance>> for FieldValue {
    fn from(list: Vec<ModelInstance>) -> Self {
        FieldValue::RelatedList(list)
    }
}

/// A keyed record tagged with the name of its model.
///
/// Instances are created per operation call and never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInstance {
    model: String,
    values: BTreeMap<String, FieldValue>,
}

impl ModelInstance {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Builds an instance from a JSON object. Non-object input yields an
    /// empty instance.
    pub fn from_json(model: impl Into<String>, json: Value) -> Self {
        match json {
            Value::Object(record) => Self::from_record(model, record),
            _ => Self::new(model),
        }
    }

    pub fn from_record(model: impl Into<String>, record: Record) -> Self {
        Self {
            model: model.into(),
            values: record
                .into_iter()
                .map(|(k, v)| (k, FieldValue::Value(v)))
                .collect(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn unset(&mut self, field: &str) -> Option<FieldValue> {
        self.values.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// The scalar value of `field`, if it holds one.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.get(field).and_then(FieldValue::as_value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flat JSON object with relations nested as objects or arrays.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_reads_object_fields() {
        let instance = ModelInstance::from_json("User", json!({"id": 1, "name": "Fred"}));
        assert_eq!(instance.model(), "User");
        assert_eq!(instance.value("id"), Some(&json!(1)));
        assert_eq!(instance.value("name"), Some(&json!("Fred")));
        assert!(!instance.contains("email"));
    }

    #[test]
    fn from_json_ignores_non_objects() {
        let instance = ModelInstance::from_json("User", json!([1, 2]));
        assert_eq!(instance.field_names().count(), 0);
    }

    #[test]
    fn missing_values() {
        assert!(FieldValue::Value(Value::Null).is_missing());
        assert!(FieldValue::Related(None).is_missing());
        assert!(!FieldValue::Value(json!(0)).is_missing());
        assert!(!FieldValue::RelatedList(vec![]).is_missing());
    }

    #[test]
    fn to_json_nests_relations() {
        let user = ModelInstance::new("User").with("id", json!(1));
        let comment = ModelInstance::new("Comment").with("id", json!(7));
        let post = ModelInstance::new("Post")
            .with("title", json!("Hello"))
            .with("user", user)
            .with("comments", vec![comment]);

        assert_eq!(
            post.to_json(),
            json!({"title": "Hello", "user": {"id": 1}, "comments": [{"id": 7}]})
        );
    }

    #[test]
    fn unresolved_relation_serializes_as_null() {
        let post = ModelInstance::new("Post").with("user", FieldValue::Related(None));
        assert_eq!(post.to_json(), json!({"user": null}));
    }
}
