use anyhow::Result;
use kv_keeper::{KeeperError, KeyError, KeyState, MemoryStore, ModelRegistry, ModelSpec};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn registry_with(store: &MemoryStore) -> Result<ModelRegistry> {
    let mut registry = ModelRegistry::with_client(Arc::new(store.clone()));
    registry.create_model(
        "comment",
        ModelSpec::new("HASH", "post:{postId}:comments:{commentId}"),
    )?;
    registry.create_model(
        "complex",
        ModelSpec::new("STRING", "a:complex:key:{a}:{b}:{c}"),
    )?;
    registry.create_model(
        "readOnlyPost",
        ModelSpec::new("HASH", "post:{postId}").allow(["hget", "hgetall", "exists"]),
    )?;
    registry.create_model("feed", ModelSpec::new("LIST", "feed"))?;
    Ok(registry)
}

#[tokio::test]
async fn test_named_params_render_key() -> Result<()> {
    let store = MemoryStore::new();
    let registry = registry_with(&store)?;

    let comment = registry
        .model("comment")
        .expect("registered")
        .get(json!({"postId": "1", "commentId": 2}));
    assert_eq!(comment.key().ok(), Some("post:1:comments:2"));

    comment.call("hset", vec![json!("body"), json!("hi")]).await?;
    assert_eq!(store.keys().await, vec!["post:1:comments:2"]);
    Ok(())
}

#[tokio::test]
async fn test_deferred_mismatch_reaches_callback_without_store() -> Result<()> {
    let store = MemoryStore::new();
    let registry = registry_with(&store)?;

    let accessor = registry.model("complex").expect("registered").get(json!({"a": 1}));
    assert!(matches!(accessor.state(), KeyState::Failed(_)));

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let first = seen.clone();
    let second = seen.clone();
    accessor
        .send("set", vec![json!("x")], move |result| {
            if let Err(KeeperError::Key(KeyError::ParamCountMismatch { missing, .. })) = result {
                first.lock().unwrap().push(missing.join(","));
            }
        })
        .send("get", vec![], move |result| {
            second.lock().unwrap().push(format!("{}", result.is_err()));
        });

    // callbacks for failed keys run before send returns
    assert_eq!(*seen.lock().unwrap(), vec!["b,c".to_string(), "true".to_string()]);
    assert_eq!(store.commands_issued(), 0);

    let err = accessor.call("get", vec![]).await.unwrap_err();
    assert!(err.to_string().contains("missing [b, c]"));
    assert_eq!(store.commands_issued(), 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_scalar_is_deferred() -> Result<()> {
    let store = MemoryStore::new();
    let registry = registry_with(&store)?;
    let post = registry.model("readOnlyPost").expect("registered");

    let accessor = post.get("");
    let err = accessor.call("hget", vec![json!("title")]).await.unwrap_err();
    assert!(matches!(
        err,
        KeeperError::Key(KeyError::InvalidParamType { ref placeholder, .. }) if placeholder == "postId"
    ));
    assert_eq!(store.commands_issued(), 0);
    Ok(())
}

#[tokio::test]
async fn test_allow_list_limits_accessor() -> Result<()> {
    let store = MemoryStore::new();
    let registry = registry_with(&store)?;
    let post = registry.model("readOnlyPost").expect("registered").get(json!([5]));

    assert_eq!(
        post.commands().collect::<Vec<_>>(),
        vec!["exists", "hget", "hgetall"]
    );
    assert!(!post.responds_to("hdel"));
    assert!(!post.responds_to("HDEL"));

    let err = post.call("hset", vec![json!("a"), json!(1)]).await.unwrap_err();
    assert!(matches!(err, KeeperError::CommandNotPermitted { ref command, .. } if command == "hset"));
    assert_eq!(post.call("HGETALL", vec![]).await?, json!({}));
    assert_eq!(store.commands_issued(), 1);
    Ok(())
}

#[tokio::test]
async fn test_literal_key_ignores_params() -> Result<()> {
    let store = MemoryStore::new();
    let registry = registry_with(&store)?;
    let feed = registry.model("feed").expect("registered");

    let a = feed.get(());
    let b = feed.get(json!({"anything": 1}));
    a.call("rpush", vec![json!("x")]).await?;
    b.call("rpush", vec![json!("y")]).await?;

    assert_eq!(a.call("lrange", vec![json!(0), json!(-1)]).await?, json!(["x", "y"]));
    assert_eq!(b.key().ok(), Some("feed"));
    Ok(())
}

#[tokio::test]
async fn test_shared_registry_serves_concurrent_readers() -> Result<()> {
    let store = MemoryStore::new();
    let registry = Arc::new(registry_with(&store)?);

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let comment = registry
                .model("comment")
                .expect("registered")
                .get(json!([i, i + 1]));
            comment.call("hset", vec![json!("n"), json!(i)]).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await??, json!(1));
    }

    assert_eq!(store.keys().await.len(), 8);
    assert!(store.keys().await.contains(&"post:3:comments:4".to_string()));
    Ok(())
}
