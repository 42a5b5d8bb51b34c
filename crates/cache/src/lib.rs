pub mod lock;
pub mod memory;
pub mod redis;

use async_trait::async_trait;

/// Atomic SET-if-absent-with-TTL cache (§6: "KV cache").
///
/// Backs distributed locks and buffer-timer dedup. Implementations must make
/// `set_nx_ex` a single atomic operation — the whole correctness of §4.1.1's
/// "exactly one timer" property rests on it.
#[async_trait]
pub trait KvCache: Send + Sync {
    /// Sets `key` to `value` with the given TTL only if `key` doesn't
    /// already exist. Returns `true` if the set happened.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> acontext_domain::Result<bool>;

    async fn del(&self, key: &str) -> acontext_domain::Result<()>;

    async fn get(&self, key: &str) -> acontext_domain::Result<Option<String>>;
}
