use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::KvCache;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process `KvCache` fake for tests and single-worker deployments. Not a
/// substitute for Redis in a multi-worker topology — the NX-EX atomicity
/// here only holds within this process.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry, now: Instant) -> bool {
        entry.expires_at > now
    }
}

#[async_trait]
impl KvCache for InMemoryCache {
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> acontext_domain::Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(key) {
            if Self::is_live(existing, now) {
                return Ok(false);
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(true)
    }

    async fn del(&self, key: &str) -> acontext_domain::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn get(&self, key: &str) -> acontext_domain::Result<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.lock();
        Ok(entries
            .get(key)
            .filter(|e| Self::is_live(e, now))
            .map(|e| e.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nx_rejects_second_set_until_expiry() {
        let cache = InMemoryCache::new();
        assert!(cache.set_nx_ex("k", "1", 60).await.unwrap());
        assert!(!cache.set_nx_ex("k", "2", 60).await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn del_allows_immediate_resets() {
        let cache = InMemoryCache::new();
        assert!(cache.set_nx_ex("k", "1", 60).await.unwrap());
        cache.del("k").await.unwrap();
        assert!(cache.set_nx_ex("k", "2", 60).await.unwrap());
    }
}
