use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};

use crate::KvCache;

/// `KvCache` backed by Redis (via `deadpool-redis`). The NX-EX contract is
/// exactly Redis's `SET key value NX EX seconds`, which is atomic server
/// side — no separate check-then-set race.
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> acontext_domain::Result<Self> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| acontext_domain::Error::Transient(format!("redis pool: {e}")))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KvCache for RedisCache {
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> acontext_domain::Result<bool> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("redis conn: {e}")))?;
        let result: Option<String> = deadpool_redis::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("redis SET NX EX: {e}")))?;
        Ok(result.is_some())
    }

    async fn del(&self, key: &str) -> acontext_domain::Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("redis conn: {e}")))?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("redis DEL: {e}")))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> acontext_domain::Result<Option<String>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("redis conn: {e}")))?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("redis GET: {e}")))?;
        Ok(value)
    }
}
