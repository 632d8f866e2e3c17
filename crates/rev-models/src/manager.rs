//! # Model Manager
//!
//! [`ModelManager`] is the registry every operation goes through. It owns:
//!
//! - the registered [`ModelMeta`] by model name, in registration order
//! - the named backends models are stored in
//! - the [`ManagerConfig`] supplying timeouts and paging defaults
//!
//! Its operation methods are a **thin facade** over [`crate::operations`]:
//! they dispatch to the matching pipeline and return its structured result.
//!
//! ## Registration Rules
//!
//! - A backend must be registered before any model that names it.
//! - A model name can be registered once.
//! - Relation targets are looked up when relations are resolved, so models
//!   may reference each other in any registration order.
//!
//! ## Example
//!
//! ```
//! use rev_models::backend::MemoryBackend;
//! use rev_models::fields::Field;
//! use rev_models::model::{ModelInstance, ModelMeta};
//! use rev_models::operations::CreateOptions;
//! use rev_models::ModelManager;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let mut manager = ModelManager::new();
//! manager.register_backend("default", Arc::new(MemoryBackend::new())).unwrap();
//! manager
//!     .register(
//!         ModelMeta::builder("City")
//!             .field(Field::auto_number("id").primary_key())
//!             .field(Field::text("name"))
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let city = ModelInstance::new("City").with("name", json!("Lisbon"));
//! let result = manager.create(city, &CreateOptions::default()).await.unwrap();
//! assert!(result.success);
//! # });
//! ```

use crate::backend::Backend;
use crate::config::ManagerConfig;
use crate::error::{ModelError, Result};
use crate::model::{ModelInstance, ModelMeta};
use crate::operations::{
    self, CreateOptions, OperationResult, ReadOptions, ReadQuery, UpdateOptions, ValidateOptions,
};
use crate::validation::ValidationResult;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Default)]
pub struct ModelManager {
    config: ManagerConfig,
    models: HashMap<String, Arc<ModelMeta>>,
    order: Vec<String>,
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // --- Registry ---

    pub fn register_backend(
        &mut self,
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
    ) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::config("backends must be registered with a name"));
        }
        if self.backends.contains_key(&name) {
            return Err(ModelError::config(format!(
                "a backend named '{}' is already registered",
                name
            )));
        }
        tracing::debug!(backend = %name, "registered backend");
        self.backends.insert(name, backend);
        Ok(())
    }

    /// Registers a model, making it available to every operation.
    pub fn register(&mut self, meta: ModelMeta) -> Result<Arc<ModelMeta>> {
        if self.models.contains_key(meta.name()) {
            return Err(ModelError::config(format!(
                "model {} is already registered",
                meta.name()
            )));
        }
        if !self.backends.contains_key(meta.backend()) {
            return Err(ModelError::config(format!(
                "model {} uses backend '{}', which is not registered",
                meta.name(),
                meta.backend()
            )));
        }
        let meta = Arc::new(meta);
        tracing::debug!(model = meta.name(), backend = meta.backend(), "registered model");
        self.order.push(meta.name().to_string());
        self.models.insert(meta.name().to_string(), Arc::clone(&meta));
        Ok(meta)
    }

    pub fn is_registered(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// Registered model names, in registration order.
    pub fn model_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn meta(&self, model: &str) -> Result<Arc<ModelMeta>> {
        self.models
            .get(model)
            .cloned()
            .ok_or_else(|| ModelError::config(format!("model {} is not registered", model)))
    }

    pub fn backend(&self, name: &str) -> Result<Arc<dyn Backend>> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::config(format!("backend '{}' is not registered", name)))
    }

    pub fn backend_for(&self, meta: &ModelMeta) -> Result<Arc<dyn Backend>> {
        self.backend(meta.backend())
    }

    // --- Operations ---

    pub async fn create(
        &self,
        instance: ModelInstance,
        options: &CreateOptions,
    ) -> Result<OperationResult> {
        operations::create::run(self, instance, options).await
    }

    pub async fn read(
        &self,
        model: &str,
        where_: &Value,
        options: &ReadOptions,
    ) -> Result<OperationResult> {
        operations::read::run(self, model, where_, options).await
    }

    pub async fn read_query(&self, model: &str, query: ReadQuery) -> Result<OperationResult> {
        let (where_, options) = query.into_parts();
        operations::read::run(self, model, &where_, &options).await
    }

    /// Reads with a JSON-encoded [`ReadQuery`].
    pub async fn read_json(&self, model: &str, query: &str) -> Result<OperationResult> {
        let query: ReadQuery = serde_json::from_str(query)?;
        self.read_query(model, query).await
    }

    pub async fn update(
        &self,
        instance: ModelInstance,
        options: &UpdateOptions,
    ) -> Result<OperationResult> {
        operations::update::run(self, instance, options).await
    }

    pub async fn remove(&self, model: &str, where_: &Value) -> Result<OperationResult> {
        operations::remove::run(self, model, where_).await
    }

    pub async fn remove_instance(&self, instance: &ModelInstance) -> Result<OperationResult> {
        operations::remove::run_instance(self, instance).await
    }

    pub async fn validate(
        &self,
        instance: &ModelInstance,
        options: &ValidateOptions,
    ) -> Result<ValidationResult> {
        operations::validate::run(self, instance, options).await
    }
}

impl fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut backends: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        backends.sort_unstable();
        f.debug_struct("ModelManager")
            .field("config", &self.config)
            .field("models", &self.order)
            .field("backends", &backends)
            .finish()
    }
}
