//! Live session stores keyed by user id.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{DataStore, FileStorage, LoadPolicy, MemoryStorage, SessionStorage};
use crate::services::{NotificationChannel, RedisStorage, RestBackend};

/// Builds the API transport for a session from the caller's bearer token.
pub type BackendFactory = Arc<dyn Fn(&str) -> Arc<dyn RestBackend> + Send + Sync>;

/// Which storage adapter new sessions get.
#[derive(Clone)]
pub enum StorageBackend {
    Memory,
    File { root: PathBuf },
    Redis(RedisStorage),
}

impl StorageBackend {
    fn for_user(&self, user_id: &str) -> Arc<dyn SessionStorage> {
        match self {
            Self::Memory => Arc::new(MemoryStorage::new()),
            Self::File { root } => Arc::new(FileStorage::new(root.join(user_dir(user_id)))),
            Self::Redis(redis) => Arc::new(redis.scoped(user_id)),
        }
    }
}

fn user_dir(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

struct Session {
    store: DataStore,
    token: String,
    last_seen: Instant,
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    backends: BackendFactory,
    storage: StorageBackend,
    channel: Option<Arc<dyn NotificationChannel>>,
    policy: LoadPolicy,
}

impl SessionRegistry {
    pub fn new(
        backends: BackendFactory,
        storage: StorageBackend,
        channel: Option<Arc<dyn NotificationChannel>>,
        policy: LoadPolicy,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            backends,
            storage,
            channel,
            policy,
        }
    }

    /// The user's store, opened on first use.
    ///
    /// A new token keeps the same store and swaps its transport, so the
    /// cached data carries over while requests use the fresh credentials.
    pub async fn open(&self, user_id: &str, token: &str) -> DataStore {
        let mut sessions = self.sessions.lock().await;

        if let Some(session) = sessions.get_mut(user_id) {
            if session.token != token {
                tracing::debug!(user_id = %user_id, "Token changed, swapping session transport");
                session.store.set_backend((self.backends)(token));
                session.token = token.to_string();
            }
            session.last_seen = Instant::now();
            return session.store.clone();
        }

        tracing::info!(user_id = %user_id, "Opening session store");
        let store = DataStore::open(
            user_id,
            (self.backends)(token),
            self.storage.for_user(user_id),
            self.channel.clone(),
            self.policy,
        )
        .await;

        sessions.insert(
            user_id.to_string(),
            Session {
                store: store.clone(),
                token: token.to_string(),
                last_seen: Instant::now(),
            },
        );
        store
    }

    /// Sign-out. Returns whether a session was open.
    pub async fn close(&self, user_id: &str) -> bool {
        let session = self.sessions.lock().await.remove(user_id);
        match session {
            Some(session) => {
                session.store.end_session().await;
                true
            }
            None => false,
        }
    }

    /// Drop sessions unused for longer than `max_idle`. Their storage is
    /// left in place, so a returning user is rehydrated. Returns how many
    /// were evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted: Vec<Session> = {
            let mut sessions = self.sessions.lock().await;
            let idle: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.last_seen.elapsed() > max_idle)
                .map(|(user_id, _)| user_id.clone())
                .collect();
            idle.iter()
                .filter_map(|user_id| sessions.remove(user_id))
                .collect()
        };

        for session in &evicted {
            session.store.detach().await;
        }
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "Evicted idle sessions");
        }
        evicted.len()
    }

    /// Run `evict_idle` every `every` until the task is dropped.
    pub async fn run_eviction(&self, every: Duration, max_idle: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.evict_idle(max_idle).await;
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityKind;
    use crate::store::persistence::CACHE_KEY;
    use crate::testing::FakeBackend;
    use parking_lot::Mutex as SyncMutex;
    use serde_json::json;

    fn registry(storage: StorageBackend) -> (SessionRegistry, Arc<SyncMutex<Vec<String>>>) {
        let backend = Arc::new(FakeBackend::new());
        backend.seed(
            "/freelancers",
            vec![json!({ "id": "f1", "name": "Ada", "vetted": true })],
        );
        let tokens = Arc::new(SyncMutex::new(Vec::new()));
        let seen = tokens.clone();
        let factory: BackendFactory = Arc::new(move |token: &str| {
            seen.lock().push(token.to_string());
            backend.clone() as Arc<dyn RestBackend>
        });
        (
            SessionRegistry::new(factory, storage, None, LoadPolicy::default()),
            tokens,
        )
    }

    #[tokio::test]
    async fn same_user_and_token_share_a_store() {
        let (registry, tokens) = registry(StorageBackend::Memory);

        let a = registry.open("u1", "t1").await;
        a.refresh(EntityKind::Freelancer).await.unwrap();
        let b = registry.open("u1", "t1").await;

        assert_eq!(b.freelancers().len(), 1);
        assert_eq!(tokens.lock().len(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn new_token_keeps_cached_data() {
        let (registry, tokens) = registry(StorageBackend::Memory);

        let first = registry.open("u1", "t1").await;
        first.refresh(EntityKind::Freelancer).await.unwrap();

        let second = registry.open("u1", "t2").await;
        assert_eq!(second.freelancers(), first.freelancers());
        assert_eq!(*tokens.lock(), vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn handles_from_an_old_token_share_the_new_transport() {
        let stale = Arc::new(FakeBackend::new());
        let fresh = Arc::new(FakeBackend::new());
        fresh.seed(
            "/freelancers",
            vec![json!({ "id": "f1", "name": "Ada", "vetted": true })],
        );
        let factory: BackendFactory = {
            let (stale, fresh) = (stale.clone(), fresh.clone());
            Arc::new(move |token: &str| -> Arc<dyn RestBackend> {
                if token == "t1" {
                    stale.clone()
                } else {
                    fresh.clone()
                }
            })
        };
        let registry =
            SessionRegistry::new(factory, StorageBackend::Memory, None, LoadPolicy::default());

        let old = registry.open("u1", "t1").await;
        let new = registry.open("u1", "t2").await;
        new.receive_notification(
            serde_json::from_value(json!({ "id": "n1", "user_id": "u1", "title": "Hi" })).unwrap(),
        )
        .await;

        // A request still holding the first handle neither clobbers the
        // newer data nor goes out with the old token
        old.refresh(EntityKind::Freelancer).await.unwrap();
        assert!(old.is_active());
        assert_eq!(stale.calls("GET", "/freelancers"), 0);
        assert_eq!(fresh.calls("GET", "/freelancers"), 1);

        let reopened = registry.open("u1", "t3").await;
        assert_eq!(reopened.notifications_for_user("u1").len(), 1);
        assert_eq!(reopened.freelancers().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted() {
        let (registry, tokens) = registry(StorageBackend::Memory);

        let idle = registry.open("u1", "t1").await;
        tokio::time::advance(Duration::from_secs(120)).await;
        let busy = registry.open("u2", "t2").await;

        assert_eq!(registry.evict_idle(Duration::from_secs(60)).await, 1);
        assert_eq!(registry.len().await, 1);
        assert!(!idle.is_active());
        assert!(busy.is_active());

        // Use refreshes the clock
        tokio::time::advance(Duration::from_secs(50)).await;
        registry.open("u2", "t2").await;
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(registry.evict_idle(Duration::from_secs(60)).await, 0);

        // The evicted user gets a fresh store on return
        let back = registry.open("u1", "t1").await;
        assert!(back.is_active());
        assert_eq!(tokens.lock().len(), 3);
    }

    #[tokio::test]
    async fn evicted_sessions_keep_their_storage() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(StorageBackend::File {
            root: dir.path().to_path_buf(),
        });

        let store = registry.open("u1", "t1").await;
        store.refresh(EntityKind::Freelancer).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.evict_idle(Duration::from_millis(5)).await, 1);

        let back = registry.open("u1", "t1").await;
        assert_eq!(back.freelancers().len(), 1);
    }

    #[tokio::test]
    async fn close_ends_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(StorageBackend::File {
            root: dir.path().to_path_buf(),
        });

        let store = registry.open("user/1", "t1").await;
        store.refresh(EntityKind::Freelancer).await.unwrap();
        let file = FileStorage::new(dir.path().join("user_1"));
        assert!(file.get_item(CACHE_KEY).await.unwrap().is_some());

        assert!(registry.close("user/1").await);
        assert!(!registry.close("user/1").await);
        assert_eq!(registry.len().await, 0);
        assert!(!store.is_active());
        assert_eq!(file.get_item(CACHE_KEY).await.unwrap(), None);
    }
}
