//! # Field Descriptors
//!
//! A [`Field`] is the declarative description of one model attribute: its
//! [`FieldKind`] (storage type or relation), its [`FieldOptions`], and the
//! validators that run against it.
//!
//! ## Field Kinds
//!
//! | Kind | Stored value | Kind-specific validators |
//! |------|--------------|--------------------------|
//! | `Text` | string | type, not-empty, min/max length |
//! | `Email` | string | type, not-empty, address shape |
//! | `Integer` | number | integer, min/max value |
//! | `Number` | number | number, min/max value |
//! | `Boolean` | bool | boolean |
//! | `Select` | string | selection membership |
//! | `MultiSelect` | list of strings | selection membership |
//! | `Date` / `Time` / `DateTime` | ISO string | format |
//! | `AutoNumber` | integer assigned by the backend | integer |
//! | `RelatedModel` | primary key of the target | key or target instance |
//! | `RelatedModelList` | nothing (reverse relation) | none |
//!
//! Every stored kind also gets the shared `Required` validator unless it is
//! disabled with [`Field::optional`].
//!
//! ## Usage
//!
//! ```
//! use rev_models::fields::Field;
//!
//! let title = Field::text("title").max_length(100).label("Title");
//! let author = Field::related_model("author", "User").optional();
//! let posts = Field::related_model_list("posts", "Post", "author");
//! # let _ = (title, author, posts);
//! ```
//!
//! Descriptors are checked when they are attached to a model by
//! [`crate::model::ModelMetaBuilder::build`]; after that they are immutable.

use crate::error::{ModelError, Result};
use crate::validation::{AsyncValidator, Validator};
use serde_json::Value;

/// `(value, label)` pairs accepted by select fields.
pub type Selection = Vec<(String, String)>;

/// Storage type or relation type of a field, with its type-specific constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text {
        min_length: Option<usize>,
        max_length: Option<usize>,
        allow_empty: bool,
    },
    Email,
    Integer {
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
    Number {
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
    Boolean,
    Select {
        selection: Selection,
    },
    MultiSelect {
        selection: Selection,
    },
    Date,
    Time,
    DateTime,
    AutoNumber,
    /// Forward relation: stores the primary key of a `model` record.
    RelatedModel { model: String },
    /// Reverse relation: the `model` records whose `field` points back here.
    RelatedModelList { model: String, field: String },
}

impl FieldKind {
    /// Short type tag, used in error messages and by schema consumers.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Email => "email",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Number { .. } => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Select { .. } => "select",
            FieldKind::MultiSelect { .. } => "multi_select",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::DateTime => "datetime",
            FieldKind::AutoNumber => "auto_number",
            FieldKind::RelatedModel { .. } => "related_model",
            FieldKind::RelatedModelList { .. } => "related_model_list",
        }
    }

    fn required_by_default(&self) -> bool {
        !matches!(
            self,
            FieldKind::AutoNumber | FieldKind::RelatedModelList { .. }
        )
    }
}

/// Options shared by every field kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOptions {
    pub label: Option<String>,
    /// `None` means "use the kind's default".
    pub required: Option<bool>,
    pub primary_key: bool,
    /// Value filled in on create when the instance does not set the field.
    pub default: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: FieldKind,
    options: FieldOptions,
    validators: Vec<Validator>,
    async_validators: Vec<AsyncValidator>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            options: FieldOptions::default(),
            validators: Vec::new(),
            async_validators: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Text {
                min_length: None,
                max_length: None,
                allow_empty: false,
            },
        )
    }

    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Integer {
                min_value: None,
                max_value: None,
            },
        )
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Number {
                min_value: None,
                max_value: None,
            },
        )
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn select<V, L>(name: impl Into<String>, selection: impl IntoIterator<Item = (V, L)>) -> Self
    where
        V: Into<String>,
        L: Into<String>,
    {
        Self::new(
            name,
            FieldKind::Select {
                selection: to_selection(selection),
            },
        )
    }

    pub fn multi_select<V, L>(
        name: impl Into<String>,
        selection: impl IntoIterator<Item = (V, L)>,
    ) -> Self
    where
        V: Into<String>,
        L: Into<String>,
    {
        Self::new(
            name,
            FieldKind::MultiSelect {
                selection: to_selection(selection),
            },
        )
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Time)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub fn auto_number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::AutoNumber)
    }

    pub fn related_model(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::RelatedModel {
                model: model.into(),
            },
        )
    }

    pub fn related_model_list(
        name: impl Into<String>,
        model: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            FieldKind::RelatedModelList {
                model: model.into(),
                field: field.into(),
            },
        )
    }

    // --- Option builders ---

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.options.label = Some(label.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.options.required = Some(required);
        self
    }

    /// Shorthand for `required(false)`.
    pub fn optional(self) -> Self {
        self.required(false)
    }

    pub fn primary_key(mut self) -> Self {
        self.options.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.options.default = Some(value);
        self
    }

    /// Sets the minimum length of a text field. Ignored by other kinds.
    pub fn min_length(mut self, len: usize) -> Self {
        if let FieldKind::Text { min_length, .. } = &mut self.kind {
            *min_length = Some(len);
        }
        self
    }

    /// Sets the maximum length of a text field. Ignored by other kinds.
    pub fn max_length(mut self, len: usize) -> Self {
        if let FieldKind::Text { max_length, .. } = &mut self.kind {
            *max_length = Some(len);
        }
        self
    }

    /// Accept `""` for a required text field.
    pub fn allow_empty(mut self) -> Self {
        if let FieldKind::Text { allow_empty, .. } = &mut self.kind {
            *allow_empty = true;
        }
        self
    }

    /// Sets the lower bound of a numeric field. Ignored by other kinds.
    pub fn min_value(mut self, value: f64) -> Self {
        match &mut self.kind {
            FieldKind::Integer { min_value, .. } | FieldKind::Number { min_value, .. } => {
                *min_value = Some(value);
            }
            _ => {}
        }
        self
    }

    /// Sets the upper bound of a numeric field. Ignored by other kinds.
    pub fn max_value(mut self, value: f64) -> Self {
        match &mut self.kind {
            FieldKind::Integer { max_value, .. } | FieldKind::Number { max_value, .. } => {
                *max_value = Some(value);
            }
            _ => {}
        }
        self
    }

    /// Adds a synchronous validator that runs after the built-in ones.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn async_validator(mut self, validator: AsyncValidator) -> Self {
        self.async_validators.push(validator);
        self
    }

    // --- Accessors ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    /// Label for display, falling back to the field name.
    pub fn display_label(&self) -> &str {
        self.options.label.as_deref().unwrap_or(&self.name)
    }

    pub fn is_required(&self) -> bool {
        self.options
            .required
            .unwrap_or_else(|| self.kind.required_by_default())
    }

    pub fn is_primary_key(&self) -> bool {
        self.options.primary_key
    }

    /// Whether values of this field live in backend records.
    pub fn is_stored(&self) -> bool {
        !matches!(self.kind, FieldKind::RelatedModelList { .. })
    }

    pub fn is_auto_number(&self) -> bool {
        matches!(self.kind, FieldKind::AutoNumber)
    }

    /// Target model name for relation fields.
    pub fn relation_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::RelatedModel { model } | FieldKind::RelatedModelList { model, .. } => {
                Some(model)
            }
            _ => None,
        }
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn async_validators(&self) -> &[AsyncValidator] {
        &self.async_validators
    }

    /// Checks the descriptor and installs the built-in validators ahead of
    /// any custom ones. Called once, when the field is attached to a model.
    pub(crate) fn attach(mut self) -> Result<Self> {
        if self.name.trim().is_empty() {
            return Err(ModelError::config("new fields must have a name"));
        }
        if self.options.primary_key && !self.is_stored() {
            return Err(ModelError::config(format!(
                "field '{}': a reverse relation cannot be a primary key",
                self.name
            )));
        }
        let mut validators = self.builtin_validators();
        validators.append(&mut self.validators);
        self.validators = validators;
        Ok(self)
    }

    fn builtin_validators(&self) -> Vec<Validator> {
        let mut validators = Vec::new();
        if !self.is_stored() {
            return validators;
        }
        if self.is_required() {
            validators.push(Validator::Required);
        }
        match &self.kind {
            FieldKind::Text {
                min_length,
                max_length,
                allow_empty,
            } => {
                validators.push(Validator::Text);
                if self.is_required() && !allow_empty {
                    validators.push(Validator::NotEmpty);
                }
                if let Some(min) = min_length {
                    validators.push(Validator::MinLength(*min));
                }
                if let Some(max) = max_length {
                    validators.push(Validator::MaxLength(*max));
                }
            }
            FieldKind::Email => {
                validators.push(Validator::Text);
                if self.is_required() {
                    validators.push(Validator::NotEmpty);
                }
                validators.push(Validator::Email);
            }
            FieldKind::Integer {
                min_value,
                max_value,
            } => {
                validators.push(Validator::Integer);
                push_range(&mut validators, *min_value, *max_value);
            }
            FieldKind::Number {
                min_value,
                max_value,
            } => {
                validators.push(Validator::Number);
                push_range(&mut validators, *min_value, *max_value);
            }
            FieldKind::Boolean => validators.push(Validator::Boolean),
            FieldKind::Select { selection } => {
                validators.push(Validator::Selection(selection_keys(selection)));
            }
            FieldKind::MultiSelect { selection } => {
                validators.push(Validator::MultiSelection(selection_keys(selection)));
            }
            FieldKind::Date => validators.push(Validator::Date),
            FieldKind::Time => validators.push(Validator::Time),
            FieldKind::DateTime => validators.push(Validator::DateTime),
            FieldKind::AutoNumber => validators.push(Validator::Integer),
            FieldKind::RelatedModel { .. } => validators.push(Validator::RelatedModel),
            FieldKind::RelatedModelList { .. } => {}
        }
        validators
    }
}

fn push_range(validators: &mut Vec<Validator>, min: Option<f64>, max: Option<f64>) {
    if let Some(min) = min {
        validators.push(Validator::MinValue(min));
    }
    if let Some(max) = max {
        validators.push(Validator::MaxValue(max));
    }
}

fn to_selection<V, L>(selection: impl IntoIterator<Item = (V, L)>) -> Selection
where
    V: Into<String>,
    L: Into<String>,
{
    selection
        .into_iter()
        .map(|(value, label)| (value.into(), label.into()))
        .collect()
}

fn selection_keys(selection: &Selection) -> Vec<String> {
    selection.iter().map(|(value, _)| value.clone()).collect()
}
