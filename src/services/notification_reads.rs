use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::core::redis::RedisHandle;

/// Per-user set of notification ids already seen.
///
/// Redis holds the markers when connected; otherwise they live in process
/// memory and are lost on restart. Both expire `ttl_seconds` after the last write.
#[derive(Clone)]
pub(crate) struct ReadMarkerStore {
    redis: RedisHandle,
    ttl_seconds: u64,
    local: Arc<RwLock<HashMap<i64, LocalMarkers>>>,
}

struct LocalMarkers {
    ids: HashSet<String>,
    expires_at: Instant,
}

impl LocalMarkers {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

fn key_for(user_id: i64) -> String {
    format!("notifications:read:{user_id}")
}

impl ReadMarkerStore {
    pub(crate) fn new(redis: RedisHandle, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds, local: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub(crate) async fn read_ids(&self, user_id: i64) -> HashSet<String> {
        match self.redis.set_members(&key_for(user_id)).await {
            Ok(Some(members)) => return members.into_iter().collect(),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Failed to read notification markers from Redis");
            }
        }

        let now = Instant::now();
        {
            let local = self.local.read().await;
            match local.get(&user_id) {
                Some(markers) if markers.is_live(now) => return markers.ids.clone(),
                None => return HashSet::new(),
                Some(_) => {}
            }
        }

        self.local.write().await.retain(|_, markers| markers.is_live(now));
        HashSet::new()
    }

    pub(crate) async fn mark_read(&self, user_id: i64, ids: &[String]) {
        if ids.is_empty() {
            return;
        }

        match self.redis.set_add_with_ttl(&key_for(user_id), ids, self.ttl_seconds).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Failed to store notification markers in Redis");
            }
        }

        let now = Instant::now();
        let expires_at = now + Duration::from_secs(self.ttl_seconds);
        let mut local = self.local.write().await;
        local.retain(|_, markers| markers.is_live(now));
        let markers = local
            .entry(user_id)
            .or_insert_with(|| LocalMarkers { ids: HashSet::new(), expires_at });
        markers.ids.extend(ids.iter().cloned());
        markers.expires_at = expires_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_ttl(ttl_seconds: u64) -> ReadMarkerStore {
        ReadMarkerStore::new(RedisHandle::new("redis://127.0.0.1:1/0".to_string()), ttl_seconds)
    }

    fn store() -> ReadMarkerStore {
        store_with_ttl(60)
    }

    #[tokio::test]
    async fn falls_back_to_memory_when_redis_is_down() {
        let store = store();
        assert!(store.read_ids(7).await.is_empty());

        store.mark_read(7, &["a".to_string(), "b".to_string()]).await;
        store.mark_read(7, &["b".to_string()]).await;

        let ids = store.read_ids(7).await;
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a"));
        assert!(store.read_ids(8).await.is_empty());
    }

    #[tokio::test]
    async fn in_memory_markers_expire_after_ttl() {
        let store = store_with_ttl(0);

        store.mark_read(7, &["a".to_string()]).await;

        assert!(store.read_ids(7).await.is_empty());
        assert!(store.local.read().await.is_empty());
    }

    #[tokio::test]
    async fn marking_again_refreshes_expiry() {
        let store = store();
        store.mark_read(7, &["a".to_string()]).await;
        let first = store.local.read().await[&7].expires_at;

        store.mark_read(7, &["b".to_string()]).await;

        let local = store.local.read().await;
        assert!(local[&7].expires_at >= first);
        assert_eq!(local[&7].ids.len(), 2);
    }

    #[tokio::test]
    async fn empty_batch_is_ignored() {
        let store = store();
        store.mark_read(1, &[]).await;
        assert!(store.local.read().await.is_empty());
    }
}
