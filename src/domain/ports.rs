use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// The store the accessors forward to.
///
/// `name` is a lowercase command from a model's effective command set and
/// `key` is the already-resolved key; `args` are whatever the caller passed
/// after it. Connection handling, retries and encoding belong to the
/// implementation.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn command(&self, name: &str, key: &str, args: Vec<Value>) -> Result<Value>;
}
