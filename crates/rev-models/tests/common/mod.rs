#![allow(dead_code)]

use rev_models::backend::MemoryBackend;
use rev_models::fields::Field;
use rev_models::model::{ModelInstance, ModelMeta};
use rev_models::ModelManager;
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Routes library events to the test output; `RUST_LOG=rev_models=debug`
/// shows operation stages.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn setup() -> (ModelManager, Arc<MemoryBackend>) {
    setup_with(ModelManager::new(), Vec::new())
}

/// Blog models, with extra fields appended to `User`.
pub fn setup_with(
    mut manager: ModelManager,
    extra_user_fields: Vec<Field>,
) -> (ModelManager, Arc<MemoryBackend>) {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    manager
        .register_backend("default", backend.clone())
        .unwrap();

    let user = ModelMeta::builder("User")
        .field(Field::auto_number("id").primary_key())
        .field(Field::text("name"))
        .field(Field::email("email"))
        .fields(extra_user_fields)
        .field(Field::related_model_list("posts", "Post", "user"))
        .build()
        .unwrap();
    let post = ModelMeta::builder("Post")
        .field(Field::auto_number("id").primary_key())
        .field(Field::text("title"))
        .field(Field::related_model("user", "User"))
        .build()
        .unwrap();
    manager.register(user).unwrap();
    manager.register(post).unwrap();
    (manager, backend)
}

pub fn user(name: &str) -> ModelInstance {
    ModelInstance::new("User")
        .with("name", json!(name))
        .with("email", json!(format!("{}@example.com", name.to_lowercase())))
}

pub fn post(title: &str, user_id: i64) -> ModelInstance {
    ModelInstance::new("Post")
        .with("title", json!(title))
        .with("user", json!(user_id))
}
