mod common;

use common::{post, setup, setup_with, user};
use rev_models::config::ManagerConfig;
use rev_models::fields::{Field, FieldKind};
use rev_models::model::ModelInstance;
use rev_models::operations::{
    CreateOptions, OperationErrorCode, OperationKind, ReadOptions, ReadQuery, UpdateOptions,
};
use rev_models::validation::{AsyncValidationInput, AsyncValidator};
use rev_models::{ModelError, ModelManager};
use serde_json::{json, Value};
use std::time::Duration;

async fn create_users(manager: &ModelManager, names: &[&str]) {
    for name in names {
        let result = manager
            .create(user(name), &CreateOptions::default())
            .await
            .unwrap();
        assert!(result.success, "failed to create {}", name);
    }
}

#[tokio::test]
async fn test_create_then_read_round_trip() {
    let (manager, _) = setup();
    let created = manager
        .create(user("Jim"), &CreateOptions::default())
        .await
        .unwrap();
    assert!(created.success);
    assert_eq!(created.operation, OperationKind::Create);

    let created = created.result.unwrap();
    assert_eq!(created.value("id"), Some(&json!(1)));

    let read = manager
        .read("User", &json!({"id": 1}), &ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(read.results.unwrap(), vec![created]);
}

#[tokio::test]
async fn test_paging_reports_total_count() {
    let (manager, _) = setup();
    create_users(&manager, &["A", "B", "C", "D", "E"]).await;

    let result = manager
        .read("User", &Value::Null, &ReadOptions::default().limit(2))
        .await
        .unwrap();

    assert_eq!(result.results.unwrap().len(), 2);
    let meta = result.meta.unwrap();
    assert_eq!(meta.total_count, 5);
    assert_eq!(meta.limit, 2);
    assert_eq!(meta.offset, 0);
}

#[tokio::test]
async fn test_default_limit_comes_from_config() {
    let config = ManagerConfig {
        default_limit: 3,
        ..ManagerConfig::default()
    };
    let (manager, _) = setup_with(ModelManager::with_config(config), Vec::new());
    create_users(&manager, &["A", "B", "C", "D"]).await;

    let result = manager
        .read("User", &Value::Null, &ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(result.results.unwrap().len(), 3);
    assert_eq!(result.meta.unwrap().limit, 3);
}

#[tokio::test]
async fn test_read_query_from_json() {
    let (manager, _) = setup();
    create_users(&manager, &["Ann", "Bob", "Amy"]).await;

    let query: ReadQuery = serde_json::from_value(json!({
        "where": {"_or": [{"name": "Bob"}, {"name": {"_like": "Am%"}}]},
        "orderBy": ["name desc"],
    }))
    .unwrap();
    let result = manager.read_query("User", query).await.unwrap();

    let names: Vec<Value> = result
        .results
        .unwrap()
        .iter()
        .map(|u| u.value("name").cloned().unwrap())
        .collect();
    assert_eq!(names, vec![json!("Bob"), json!("Amy")]);
}

#[tokio::test]
async fn test_required_field_error() {
    let (manager, backend) = setup();
    let result = manager
        .create(
            ModelInstance::new("User").with("email", json!("x@example.com")),
            &CreateOptions::default(),
        )
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.has_error(OperationErrorCode::ValidationFailed));
    let validation = result.validation.unwrap();
    assert_eq!(validation.errors_for("name")[0].code, "required");
    assert_eq!(backend.count("User"), 0);
}

#[tokio::test]
async fn test_extra_field_is_a_model_error() {
    let (manager, _) = setup();
    let result = manager
        .create(user("Jim").with("nickname", json!("J")), &CreateOptions::default())
        .await
        .unwrap();

    assert!(!result.success);
    let validation = result.validation.unwrap();
    assert_eq!(validation.model_errors[0].code, "extra_field");
}

#[tokio::test]
async fn test_async_validator_rejects_on_create() {
    let taken = Field::text("username").async_validator(AsyncValidator::new(
        "username_taken",
        |input: AsyncValidationInput| async move {
            (input.instance.value("username") == Some(&json!("admin")))
                .then(|| "That username is taken".to_string())
        },
    ));
    let (manager, _) = setup_with(ModelManager::new(), vec![taken]);

    let result = manager
        .create(user("Jim").with("username", json!("admin")), &CreateOptions::default())
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.validation.unwrap().has_error("username", "username_taken"));

    let result = manager
        .create(user("Jim").with("username", json!("jim")), &CreateOptions::default())
        .await
        .unwrap();
    assert!(result.success);
}

#[tokio::test(start_paused = true)]
async fn test_validation_timeout_fails_create() {
    let hangs = Field::text("username").async_validator(AsyncValidator::new(
        "hangs",
        |_input: AsyncValidationInput| std::future::pending::<Option<String>>(),
    ));
    let (manager, backend) = setup_with(ModelManager::new(), vec![hangs]);

    let options = CreateOptions {
        timeout: Some(Duration::from_millis(50)),
    };
    let err = manager
        .create(user("Jim").with("username", json!("jim")), &options)
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::ValidationTimeout { timeout_ms: 50, .. }));
    assert_eq!(backend.count("User"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_is_five_seconds() {
    let slow = Field::text("username").async_validator(AsyncValidator::new(
        "slow",
        |_input: AsyncValidationInput| async {
            tokio::time::sleep(Duration::from_millis(4_900)).await;
            None
        },
    ));
    let (manager, _) = setup_with(ModelManager::new(), vec![slow]);

    let result = manager
        .create(user("Jim").with("username", json!("jim")), &CreateOptions::default())
        .await
        .unwrap();
    assert!(result.success);
}

#[tokio::test]
async fn test_update_and_remove_by_instance() {
    let (manager, backend) = setup();
    create_users(&manager, &["Ann", "Bob"]).await;

    let renamed = ModelInstance::new("User")
        .with("id", json!(2))
        .with("name", json!("Robert"));
    let result = manager.update(renamed, &UpdateOptions::default()).await.unwrap();
    assert!(result.success);
    assert_eq!(result.affected, Some(1));

    let missing = ModelInstance::new("User")
        .with("id", json!(7))
        .with("name", json!("Nobody"));
    let result = manager.update(missing.clone(), &UpdateOptions::default()).await.unwrap();
    assert!(result.has_error(OperationErrorCode::NotFound));

    let result = manager.remove_instance(&missing).await.unwrap();
    assert!(result.has_error(OperationErrorCode::NotFound));

    let result = manager
        .remove_instance(&ModelInstance::new("User").with("id", json!(1)))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(backend.count("User"), 1);
}

#[tokio::test]
async fn test_remove_matching_nothing_succeeds() {
    let (manager, _) = setup();
    create_users(&manager, &["Ann"]).await;

    let result = manager.remove("User", &json!({"id": 99})).await.unwrap();
    assert!(result.success);
    assert_eq!(result.affected, Some(0));
    assert_eq!(result.operation, OperationKind::Remove);
}

#[tokio::test]
async fn test_backend_fault_propagates() {
    let (manager, backend) = setup();
    create_users(&manager, &["Ann"]).await;
    backend.set_simulate_failure(true);

    let err = manager
        .read("User", &Value::Null, &ReadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Backend(_)));

    let err = manager.remove("User", &Value::Null).await.unwrap_err();
    assert!(matches!(err, ModelError::Backend(_)));
}

#[tokio::test]
async fn test_unregistered_model_is_rejected() {
    let (manager, _) = setup();
    let err = manager
        .read("Ghost", &Value::Null, &ReadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Configuration(_)));
}

#[test]
fn test_metadata_keeps_declaration_order() {
    let (manager, _) = setup();
    let meta = manager.meta("User").unwrap();

    let names: Vec<&str> = meta.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "name", "email", "posts"]);
    assert_eq!(meta.primary_key(), Some("id"));
    assert_eq!(meta.label(), "User");
    assert!(matches!(
        meta.field("posts").unwrap().kind(),
        FieldKind::RelatedModelList { .. }
    ));
    assert_eq!(manager.model_names(), vec!["User", "Post"]);
}

#[tokio::test]
async fn test_created_post_keeps_raw_foreign_key() {
    let (manager, _) = setup();
    create_users(&manager, &["Ann"]).await;

    let result = manager
        .create(post("Hello", 1), &CreateOptions::default())
        .await
        .unwrap();
    assert_eq!(result.result.unwrap().value("user"), Some(&json!(1)));
}
