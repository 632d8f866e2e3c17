//! Blog fixtures: `User` has many `Post`s, `Post` has many `Comment`s.

use crate::backend::MemoryBackend;
use crate::fields::Field;
use crate::manager::ModelManager;
use crate::model::{ModelInstance, ModelMeta};
use serde_json::json;
use std::sync::Arc;

pub type BlogBackend = Arc<MemoryBackend>;

pub fn user_meta() -> ModelMeta {
    ModelMeta::builder("User")
        .label("Users")
        .field(Field::auto_number("id").primary_key())
        .field(Field::text("name").max_length(60))
        .field(Field::email("email"))
        .field(Field::boolean("active").default_value(json!(true)))
        .field(Field::integer("age").optional().min_value(0.0))
        .field(Field::related_model_list("posts", "Post", "user"))
        .build()
        .expect("user fixture is valid")
}

pub fn post_meta() -> ModelMeta {
    ModelMeta::builder("Post")
        .field(Field::auto_number("id").primary_key())
        .field(Field::text("title").max_length(200))
        .field(Field::text("body").optional())
        .field(Field::related_model("user", "User"))
        .field(Field::related_model_list("comments", "Comment", "post"))
        .build()
        .expect("post fixture is valid")
}

pub fn comment_meta() -> ModelMeta {
    ModelMeta::builder("Comment")
        .field(Field::auto_number("id").primary_key())
        .field(Field::related_model("post", "Post"))
        .field(Field::text("text"))
        .build()
        .expect("comment fixture is valid")
}

/// A manager with the blog models on a fresh in-memory backend, plus a handle
/// to that backend for inspection.
pub fn blog() -> (ModelManager, BlogBackend) {
    blog_with(ModelManager::new(), MemoryBackend::new())
}

pub fn blog_with(mut manager: ModelManager, backend: MemoryBackend) -> (ModelManager, BlogBackend) {
    let backend = Arc::new(backend);
    manager
        .register_backend("default", backend.clone())
        .expect("fresh manager accepts the default backend");
    for meta in [user_meta(), post_meta(), comment_meta()] {
        manager.register(meta).expect("blog fixtures register");
    }
    (manager, backend)
}

pub fn user(name: &str, email: &str) -> ModelInstance {
    ModelInstance::new("User")
        .with("name", json!(name))
        .with("email", json!(email))
}

pub fn post(title: &str, user_id: i64) -> ModelInstance {
    ModelInstance::new("Post")
        .with("title", json!(title))
        .with("user", json!(user_id))
}

pub fn comment(post_id: i64, text: &str) -> ModelInstance {
    ModelInstance::new("Comment")
        .with("post", json!(post_id))
        .with("text", json!(text))
}
