//! Redis-backed session storage.
//!
//! Session keys are namespaced per user (`session:{user_id}:{key}`) and
//! expire after the session TTL, refreshed on every write. Connections are
//! pooled via `ConnectionManager` and shared by every scoped handle.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{ApiError, ApiResult};
use crate::store::SessionStorage;

#[derive(Clone)]
pub struct RedisStorage {
    conn: ConnectionManager,
    ttl: Duration,
    namespace: String,
}

impl RedisStorage {
    /// Connect to Redis. The returned handle is unscoped; call
    /// [`RedisStorage::scoped`] per session.
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!("Redis session storage connected");

        Ok(Self {
            conn,
            ttl: Duration::from_secs(ttl_seconds),
            namespace: "session".to_string(),
        })
    }

    /// Handle whose keys live under this user's namespace.
    pub fn scoped(&self, user_id: &str) -> Self {
        Self {
            conn: self.conn.clone(),
            ttl: self.ttl,
            namespace: keys::session_namespace(user_id),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis health check failed")?;
        Ok(())
    }
}

fn storage_error(e: redis::RedisError) -> ApiError {
    ApiError::storage(format!("redis: {}", e))
}

#[async_trait]
impl SessionStorage for RedisStorage {
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn get_item(&self, key: &str) -> ApiResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.key(key)).await.map_err(storage_error)?;
        debug!(key = key, hit = value.is_some(), "Session storage read");
        Ok(value)
    }

    #[instrument(skip(self, value), fields(namespace = %self.namespace))]
    async fn set_item(&self, key: &str, value: &str) -> ApiResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.key(key), value, self.ttl.as_secs())
            .await
            .map_err(storage_error)?;
        debug!(key = key, ttl_secs = self.ttl.as_secs(), bytes = value.len(), "Session storage write");
        Ok(())
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn remove_item(&self, key: &str) -> ApiResult<()> {
        let mut conn = self.conn.clone();
        let deleted: i32 = conn.del(self.key(key)).await.map_err(storage_error)?;
        debug!(key = key, deleted = deleted > 0, "Session storage delete");
        Ok(())
    }
}

/// Key builders for consistent key formats.
pub mod keys {
    /// Namespace holding one user's session keys
    pub fn session_namespace(user_id: &str) -> String {
        format!("session:{}", user_id)
    }
}
