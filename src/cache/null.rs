//! 空去重缓存
//!
//! set_if_absent 永远返回 false：所有事件按非 unique 处理。
//! 用于未配置缓存或 Redis 不可达时的降级运行。

use std::time::Duration;

use super::{CacheCapability, DedupCache};

pub struct NullDedupCache;

#[async_trait::async_trait]
impl DedupCache for NullDedupCache {
    async fn set_if_absent(&self, _key: &str, _ttl: Duration) -> bool {
        false
    }

    fn capability(&self) -> CacheCapability {
        CacheCapability::FullClearOnly
    }

    async fn purge_pattern(&self, _pattern: &str) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn clear_all(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "null"
    }
}
