//! In-memory Session Store

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::session::store::SessionStore;
use crate::session::{SessionData, SessionResult};

struct Entry {
    data: SessionData,
    expires_at: Instant,
}

/// Process-local session store; clones share the same map
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> SessionResult<Option<SessionData>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.get(id).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(id);
        }
        Ok(entries.get(id).map(|entry| entry.data.clone()))
    }

    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> SessionResult<()> {
        self.entries.write().await.insert(
            id.to_string(),
            Entry {
                data: data.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn destroy(&self, id: &str) -> SessionResult<()> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> SessionResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::spawn_cleanup;
    use auth::models::UserId;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemorySessionStore::new();
        let data = SessionData {
            user_id: UserId::new(1),
            ..SessionData::default()
        };

        store
            .save("sid", &data, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.load("sid").await.unwrap(), Some(data));
        assert_eq!(store.load("other").await.unwrap(), None);

        store.destroy("sid").await.unwrap();
        assert_eq!(store.load("sid").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_evicts_expired_entry() {
        let store = MemorySessionStore::new();
        store
            .save("expired", &SessionData::default(), Duration::ZERO)
            .await
            .unwrap();
        store
            .save("long", &SessionData::default(), Duration::from_secs(100))
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);

        assert_eq!(store.load("expired").await.unwrap(), None);
        assert_eq!(store.len().await, 1);
        assert!(store.load("long").await.unwrap().is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired_counts_deleted() {
        let store = MemorySessionStore::new();
        for id in ["a", "b"] {
            store
                .save(id, &SessionData::default(), Duration::ZERO)
                .await
                .unwrap();
        }
        store
            .save("long", &SessionData::default(), Duration::from_secs(100))
            .await
            .unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 2);
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_periodic_cleanup_shrinks_store() {
        let store = Arc::new(MemorySessionStore::new());
        for i in 0..50 {
            store
                .save(
                    &format!("visitor-{}", i),
                    &SessionData::default(),
                    Duration::from_millis(5),
                )
                .await
                .unwrap();
        }
        store
            .save("live", &SessionData::default(), Duration::from_secs(100))
            .await
            .unwrap();
        assert_eq!(store.len().await, 51);

        let task = spawn_cleanup(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(store.len().await, 1);
        assert!(store.load("live").await.unwrap().is_some());
    }
}
