//! Session storage adapters.
//!
//! The store mirrors its cache into a key/value storage that lives as long as
//! the user session. Two keys are used: the serialized cache and the
//! client-generated timestamp of the last successful project load. Both are
//! plain JSON with no schema version.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::cache::EntityCache;
use crate::error::{ApiError, ApiResult};

pub const CACHE_KEY: &str = "connect_accel.data";
pub const PROJECTS_LOADED_AT_KEY: &str = "connect_accel.projects_loaded_at";

/// Key/value persistence strategy injected into the store.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> ApiResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> ApiResult<()>;

    async fn remove_item(&self, key: &str) -> ApiResult<()>;
}

/// Rehydrate the cache. Missing, unreadable or corrupted data yields the
/// empty cache; the failure is only logged.
pub async fn restore_cache(storage: &dyn SessionStorage) -> EntityCache {
    let raw = match storage.get_item(CACHE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return EntityCache::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read cached session data");
            return EntityCache::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding corrupted session cache");
            EntityCache::default()
        }
    }
}

/// Epoch milliseconds stored under `key`, if present and well formed.
pub async fn read_timestamp(storage: &dyn SessionStorage, key: &str) -> Option<i64> {
    match storage.get_item(key).await {
        Ok(Some(raw)) => serde_json::from_str::<i64>(raw.trim()).ok(),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Failed to read timestamp");
            None
        }
    }
}

// ============================================================================
// In-memory storage
// ============================================================================

/// Process-local storage; contents vanish with the session.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> ApiResult<()> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> ApiResult<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// File storage
// ============================================================================

/// One JSON file per key inside a per-session directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

/// Write to a temp file in the target directory, then rename over the target
/// so readers never observe a partial file.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(data)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::storage(format!("storage task failed: {}", e)))?
        .map_err(|e| ApiError::storage(e.to_string()))
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn get_item(&self, key: &str) -> ApiResult<Option<String>> {
        let path = self.path_for(key);
        blocking(move || match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set_item(&self, key: &str, value: &str) -> ApiResult<()> {
        let path = self.path_for(key);
        let data = value.as_bytes().to_vec();
        blocking(move || atomic_write(&path, &data)).await
    }

    async fn remove_item(&self, key: &str) -> ApiResult<()> {
        let path = self.path_for(key);
        blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }
}
