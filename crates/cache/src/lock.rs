use std::sync::Arc;

use tracing::warn;

use crate::KvCache;

/// A held distributed lock. Unlike `parking_lot`'s in-process locks, the
/// lock lives in the cache process, not in our address space, so it cannot
/// auto-release on `Drop` (that would require blocking or spawning from
/// `Drop`, which async code can't do safely). Callers MUST call
/// [`LockHandle::release`] on every exit path of the critical section —
/// mirroring the "guaranteed finally block" called for in §4.5.1 and §5.
#[must_use = "a LockHandle must be released on every exit path"]
pub struct LockHandle {
    key: String,
    cache: Arc<dyn KvCache>,
}

impl LockHandle {
    pub async fn release(self) {
        if let Err(e) = self.cache.del(&self.key).await {
            warn!(key = %self.key, error = %e, "failed to release distributed lock; it will expire via TTL");
        }
    }
}

/// Thin wrapper over `KvCache::set_nx_ex` for the three lock keys in §5:
/// per-session message lock, per-Learning-Space skill-learn lock, and the
/// per-session buffer-timer dedup key (which is used as a one-shot flag,
/// never explicitly released — it's `prune`d by its own TTL only).
#[derive(Clone)]
pub struct DistributedLock {
    cache: Arc<dyn KvCache>,
}

impl DistributedLock {
    pub fn new(cache: Arc<dyn KvCache>) -> Self {
        Self { cache }
    }

    pub fn session_message_key(project_id: &str, session_id: &str) -> String {
        format!("lock.{project_id}.message.{session_id}")
    }

    pub fn skill_learn_key(project_id: &str, learning_space_id: &str) -> String {
        format!("lock.{project_id}.skill_learn.{learning_space_id}")
    }

    pub fn buffer_timer_key(project_id: &str, session_id: &str) -> String {
        format!("buffer_timer.{project_id}.{session_id}")
    }

    /// Attempts to acquire `key` for `ttl_seconds`. Returns `None` if
    /// contended (caller maps that to `ErrLockContended` or a retry-queue
    /// republish per the call site's policy).
    pub async fn try_acquire(&self, key: &str, ttl_seconds: u64) -> acontext_domain::Result<Option<LockHandle>> {
        let acquired = self
            .cache
            .set_nx_ex(key, "1", ttl_seconds)
            .await?;
        if acquired {
            Ok(Some(LockHandle {
                key: key.to_string(),
                cache: self.cache.clone(),
            }))
        } else {
            Ok(None)
        }
    }

    /// Fire-and-forget timer dedup set (§4.1.1): the caller never releases
    /// this key explicitly, it just expires.
    pub async fn try_set_timer_flag(&self, key: &str, ttl_seconds: u64) -> acontext_domain::Result<bool> {
        self.cache.set_nx_ex(key, "1", ttl_seconds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCache;

    #[tokio::test]
    async fn second_acquire_fails_until_release() {
        let cache: Arc<dyn KvCache> = Arc::new(InMemoryCache::new());
        let lock = DistributedLock::new(cache);
        let key = DistributedLock::skill_learn_key("p1", "ls1");

        let h1 = lock.try_acquire(&key, 60).await.unwrap();
        assert!(h1.is_some());
        let h2 = lock.try_acquire(&key, 60).await.unwrap();
        assert!(h2.is_none());

        h1.unwrap().release().await;
        let h3 = lock.try_acquire(&key, 60).await.unwrap();
        assert!(h3.is_some());
    }

    #[tokio::test]
    async fn timer_flag_is_one_shot_per_ttl_window() {
        let cache: Arc<dyn KvCache> = Arc::new(InMemoryCache::new());
        let lock = DistributedLock::new(cache);
        let key = DistributedLock::buffer_timer_key("p1", "s1");

        assert!(lock.try_set_timer_flag(&key, 60).await.unwrap());
        assert!(!lock.try_set_timer_flag(&key, 60).await.unwrap());
    }
}
