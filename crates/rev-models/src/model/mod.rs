//! # Models
//!
//! - [`ModelMeta`]: the registered shape of a model (fields, primary key,
//!   backend name), built once with [`ModelMeta::builder`].
//! - [`ModelInstance`]: a keyed record tagged with its model, produced and
//!   consumed by every operation.

mod instance;
mod meta;

pub use instance::{FieldValue, ModelInstance, Record};
pub use meta::{ModelMeta, ModelMetaBuilder, ModelValidator, DEFAULT_BACKEND};
