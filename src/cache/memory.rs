//! 进程内去重缓存（moka）
//!
//! 单实例部署和测试用。TTL 在 moka 的 Expiry 策略里按条目设置，
//! 与 Redis 实现的语义保持一致。

use std::time::{Duration, Instant};

use moka::sync::Cache;
use tracing::trace;

use super::{CacheCapability, DedupCache};

/// 每个条目携带自己的 TTL
struct PerEntryTtl;

impl moka::Expiry<String, Duration> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Duration,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(*value)
    }
}

pub struct MemoryDedupCache {
    cache: Cache<String, Duration>,
}

impl Default for MemoryDedupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDedupCache {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1_000_000)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait::async_trait]
impl DedupCache for MemoryDedupCache {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> bool {
        // entry().or_insert() 在 moka 内部是原子的，
        // is_fresh 为 true 表示本次调用完成了插入
        let entry = self.cache.entry(key.to_string()).or_insert(ttl);
        let fresh = entry.is_fresh();
        trace!("Memory dedup key '{}': fresh = {}", key, fresh);
        fresh
    }

    fn capability(&self) -> CacheCapability {
        CacheCapability::FullClearOnly
    }

    async fn purge_pattern(&self, _pattern: &str) -> anyhow::Result<u64> {
        anyhow::bail!("memory dedup cache does not support pattern delete")
    }

    async fn clear_all(&self) -> anyhow::Result<()> {
        self.cache.invalidate_all();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
