use anyhow::Result;
use kv_keeper::{KeeperError, MemoryStore, ModelRegistry, ModelSpec, StoreClient};
use serde_json::json;
use std::sync::Arc;

fn model_definitions() -> Vec<(&'static str, ModelSpec)> {
    vec![
        (
            "post",
            ModelSpec::new("HASH", "post:{postId}").with_metadata(
                "fields",
                json!({"count": {"like": "like:count", "comment": "comments:count"}}),
            ),
        ),
        (
            "postCommentsIndex",
            ModelSpec::new("STRING", "post:{postId}:comments:index").disable(["decr"]),
        ),
        (
            "postCommentsCount",
            ModelSpec::new("STRING", "post:{postId}:comments:count"),
        ),
        ("string", ModelSpec::new("STRING", "string")),
    ]
}

/// `create_models` returns one definition per declaration.
#[test]
fn test_create_models_returns_one_definition_per_entry() -> Result<()> {
    let mut registry = ModelRegistry::new();
    let definitions = model_definitions();
    let count = definitions.len();

    let models = registry.create_models(definitions)?;

    assert_eq!(models.len(), count);
    assert_eq!(registry.len(), count);
    let names: Vec<&str> = models.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["post", "postCommentsIndex", "postCommentsCount", "string"]);
    Ok(())
}

#[test]
fn test_builtin_types_are_registered() {
    let registry = ModelRegistry::new();
    for name in ["STRING", "HASH", "LIST", "SET", "SORTED_SET", "GENERIC"] {
        assert!(registry.model_type(name).is_some(), "missing type {}", name);
    }
}

#[test]
fn test_definition_keeps_original_spec() -> Result<()> {
    let mut registry = ModelRegistry::new();
    registry.create_models(model_definitions())?;

    let post = registry.definition("post").expect("post registered");
    assert_eq!(post.spec(), &model_definitions()[0].1);
    assert_eq!(
        post.proxy().fields().expect("fields attached")["count"]["like"],
        json!("like:count")
    );
    Ok(())
}

#[test]
fn test_batch_stops_at_first_failure_without_rollback() {
    let mut registry = ModelRegistry::new();
    let result = registry.create_models(vec![
        ("a", ModelSpec::new("STRING", "a")),
        ("b", ModelSpec::new("NOPE", "b")),
        ("c", ModelSpec::new("STRING", "c")),
    ]);

    assert!(matches!(result, Err(KeeperError::UnknownModelType { ref name, .. }) if name == "b"));
    assert!(registry.definition("a").is_some());
    assert!(registry.definition("c").is_none());

    let retry = registry.create_models(vec![("a", ModelSpec::new("STRING", "a"))]);
    assert!(matches!(retry, Err(KeeperError::DuplicateModelName { .. })));
}

#[tokio::test]
async fn test_hash_model_forwards_with_resolved_key() -> Result<()> {
    let store = MemoryStore::new();
    let mut registry = ModelRegistry::with_client(Arc::new(store.clone()));
    registry.create_models(model_definitions())?;

    let post = registry.model("post").expect("post registered").get("1234");
    assert_eq!(post.key().ok(), Some("post:1234"));

    assert_eq!(post.call("hset", vec![json!("c"), json!(1)]).await?, json!(1));
    assert_eq!(post.call("hset", vec![json!("c"), json!(1)]).await?, json!(0));
    assert_eq!(store.command("hget", "post:1234", vec![json!("c")]).await?, json!("1"));
    Ok(())
}

#[tokio::test]
async fn test_client_can_be_set_after_construction() -> Result<()> {
    let mut registry = ModelRegistry::new();
    registry.create_models(model_definitions())?;

    let detached = registry.model("string").expect("string registered").get(());
    assert!(matches!(
        detached.call("get", vec![]).await,
        Err(KeeperError::ClientNotConfigured { .. })
    ));

    registry.set_client(Arc::new(MemoryStore::new()));
    let string = registry.model("string").expect("string registered").get(());

    let (tx, rx) = tokio::sync::oneshot::channel();
    string.send("set", vec![json!(1)], move |result| {
        let _ = tx.send(result);
    });
    assert_eq!(rx.await??, json!("OK"));

    let (tx, rx) = tokio::sync::oneshot::channel();
    string.send("get", vec![], move |result| {
        let _ = tx.send(result);
    });
    assert_eq!(rx.await??, json!("1"));
    Ok(())
}

#[test]
fn test_disabled_command_is_absent() -> Result<()> {
    let mut registry = ModelRegistry::new();
    registry.create_models(model_definitions())?;

    let index = registry.model("postCommentsIndex").expect("registered").get(7);
    assert!(!index.responds_to("decr"));
    assert!(!index.responds_to("DECR"));
    assert!(index.responds_to("incr"));
    assert_eq!(index.key().ok(), Some("post:7:comments:index"));
    Ok(())
}
