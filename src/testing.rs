//! In-memory stand-in for the marketplace API used across unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::app::{create_app, AppState};
use crate::auth::jwt::test_tokens::SECRET;
use crate::auth::TokenVerifier;
use crate::config::{Environment, Settings, StorageKind};
use crate::error::{ApiError, ApiResult};
use crate::services::{ApiClient, NotificationChannel, RestBackend, SocketHub};
use crate::store::{BackendFactory, LoadPolicy, SessionRegistry, StorageBackend};

#[derive(Default)]
pub struct FakeBackend {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    failures: Mutex<HashMap<(String, String), VecDeque<ApiError>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, String)>>,
}

fn split_path(path: &str) -> (String, Option<String>) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((collection, id)) => (format!("/{}", collection), Some(id.to_string())),
        None => (format!("/{}", trimmed), None),
    }
}

/// Records may be keyed by `id` or `_id`, like the real API.
fn id_of(value: &Value) -> Option<String> {
    match value.get("id").or_else(|| value.get("_id")) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, collection: &str, records: Vec<Value>) {
        self.collections
            .lock()
            .insert(collection.to_string(), records);
    }

    /// Fail the next `method` call on exactly `path` with `error`.
    pub fn fail_next(&self, method: &str, path: &str, error: ApiError) {
        self.failures
            .lock()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(error);
    }

    /// Delay every call on exactly `path`.
    pub fn set_delay(&self, path: &str, delay: Duration) {
        self.delays.lock().insert(path.to_string(), delay);
    }

    /// Number of `method` calls whose path starts with `prefix`.
    pub fn calls(&self, method: &str, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(m, p)| m == method && p.starts_with(prefix))
            .count()
    }

    pub fn record(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .lock()
            .get(collection)
            .and_then(|records| records.iter().find(|r| id_of(r).as_deref() == Some(id)))
            .cloned()
    }

    async fn enter(&self, method: &str, path: &str) -> ApiResult<()> {
        self.calls
            .lock()
            .push((method.to_string(), path.to_string()));

        let delay = self.delays.lock().get(path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .lock()
            .get_mut(&(method.to_string(), path.to_string()))
            .and_then(|queue| queue.pop_front());
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RestBackend for FakeBackend {
    async fn get(&self, path: &str) -> ApiResult<Value> {
        self.enter("GET", path).await?;
        let (collection, id) = split_path(path);
        let collections = self.collections.lock();
        let records = collections.get(&collection).cloned().unwrap_or_default();
        match id {
            None => Ok(Value::Array(records)),
            Some(id) => records
                .into_iter()
                .find(|r| id_of(r).as_deref() == Some(id.as_str()))
                .ok_or_else(|| ApiError::not_found(format!("{} not found", path))),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.enter("POST", path).await?;
        let (collection, _) = split_path(path);
        let mut record = match body {
            Value::Object(map) => map.clone(),
            _ => return Err(ApiError::bad_request("expected object body")),
        };
        if !record.contains_key("id") && !record.contains_key("_id") {
            record.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        let record = Value::Object(record);
        self.collections
            .lock()
            .entry(collection)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn patch(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.enter("PATCH", path).await?;
        let (collection, id) = split_path(path);
        let id = id.ok_or_else(|| ApiError::bad_request("missing id"))?;
        let mut collections = self.collections.lock();
        let record = collections
            .get_mut(&collection)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| id_of(r).as_deref() == Some(id.as_str()))
            })
            .ok_or_else(|| ApiError::not_found(format!("{} not found", path)))?;

        let patch: Map<String, Value> = body.as_object().cloned().unwrap_or_default();
        if let Value::Object(existing) = &mut *record {
            for (key, value) in patch {
                existing.insert(key, value);
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.enter("DELETE", path).await?;
        let (collection, id) = split_path(path);
        let id = id.ok_or_else(|| ApiError::bad_request("missing id"))?;
        let mut collections = self.collections.lock();
        let records = collections.entry(collection).or_default();
        let before = records.len();
        records.retain(|r| id_of(r).as_deref() != Some(id.as_str()));
        if records.len() == before {
            return Err(ApiError::not_found(format!("{} not found", path)));
        }
        Ok(())
    }
}

pub fn test_settings() -> Settings {
    Settings {
        env: Environment::Dev,
        server_addr: "127.0.0.1:0".to_string(),
        cors_allow_origins: vec!["http://localhost:3000".to_string()],
        // Nothing listens here; health checks report the API as down
        api_base_url: "http://127.0.0.1:9".to_string(),
        api_timeout_seconds: 1,
        jwt_secret: SECRET.to_string(),
        jwt_issuer: None,
        session_storage: StorageKind::Memory,
        session_storage_dir: PathBuf::from(".sessions"),
        redis_url: "redis://127.0.0.1:6379/0".to_string(),
        session_ttl_seconds: 60,
        project_cache_ttl: Duration::from_millis(30_000),
        rate_limit_retry_delay: Duration::from_millis(5_000),
    }
}

/// The full router with every session served by `backend`.
pub fn test_app(backend: Arc<FakeBackend>) -> (axum::Router, Arc<AppState>) {
    let settings = test_settings();
    let backends: BackendFactory = Arc::new(move |_token: &str| -> Arc<dyn RestBackend> {
        backend.clone()
    });
    let hub = SocketHub::new(16);
    let channel: Arc<dyn NotificationChannel> = Arc::new(hub.clone());
    let sessions = SessionRegistry::new(
        backends,
        StorageBackend::Memory,
        Some(channel),
        LoadPolicy::default(),
    );
    let api_client = ApiClient::new(&settings.api_base_url, settings.api_timeout_seconds)
        .expect("test client");
    let verifier = TokenVerifier::new(SECRET, None);

    let state = AppState::new(settings, verifier, sessions, hub, api_client);
    (create_app(state.clone()), state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_are_addressable_by_underscore_id() {
        let backend = FakeBackend::new();
        backend.seed(
            "/projects",
            vec![json!({ "_id": "p1", "title": "Mobile app", "status": "open" })],
        );

        let patched = backend
            .patch("/projects/p1", &json!({ "status": "assigned" }))
            .await
            .unwrap();
        assert_eq!(patched["_id"], "p1");
        assert_eq!(patched["status"], "assigned");
        assert_eq!(backend.record("/projects", "p1").unwrap()["status"], "assigned");

        backend.delete("/projects/p1").await.unwrap();
        assert!(backend.get("/projects/p1").await.is_err());
    }
}
