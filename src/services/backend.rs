//! Transport seam between the entity store and the marketplace REST API.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;

/// JSON-over-HTTP access to the marketplace API.
///
/// `ApiClient` is the production implementation; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait RestBackend: Send + Sync {
    async fn get(&self, path: &str) -> ApiResult<Value>;

    async fn post(&self, path: &str, body: &Value) -> ApiResult<Value>;

    async fn patch(&self, path: &str, body: &Value) -> ApiResult<Value>;

    async fn delete(&self, path: &str) -> ApiResult<()>;
}

/// Strip a `{ "data": ... }` envelope if the API wrapped its payload in one.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() <= 2 && map.contains_key("data") => {
            // `{ data, meta }` and `{ data }` are envelopes; anything wider is a record
            let only_meta = map.keys().all(|k| k == "data" || k == "meta");
            if only_meta {
                map.remove("data").unwrap_or(Value::Null)
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}
