//! 去重缓存
//!
//! 共享的 set-if-absent + TTL 键值存储，用于标记
//! “这个 (事件类型, 目标, 会话) 组合在窗口内已计过一次 unique”。
//!
//! 三个实现：
//! - `redis`: 跨进程共享（生产部署）
//! - `memory`: 进程内 moka 缓存（单实例 / 测试）
//! - `null`: 永远未命中，所有事件按非 unique 处理（降级模式）

pub mod memory;
pub mod null;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::CacheConfig;

pub use memory::MemoryDedupCache;
pub use null::NullDedupCache;
pub use redis::RedisDedupCache;

/// 缓存批量失效能力
///
/// 调用方根据能力分支，而不是在运行时捕获“方法不存在”。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCapability {
    /// 支持按模式删除（如 Redis SCAN + DEL）
    PatternDelete,
    /// 只支持整体清空
    FullClearOnly,
}

/// 去重缓存接口
#[async_trait::async_trait]
pub trait DedupCache: Send + Sync {
    /// 原子 set-if-absent，带 TTL
    ///
    /// 返回 true 表示键此前不存在（本次事件计为 unique）。
    /// 缓存不可用时必须返回 false 并自行记录错误——
    /// 采集路径绝不因缓存故障而失败。
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> bool;

    /// 返回该实现的批量失效能力
    fn capability(&self) -> CacheCapability;

    /// 按模式删除键，返回删除数量（仅 PatternDelete 实现）
    async fn purge_pattern(&self, pattern: &str) -> anyhow::Result<u64>;

    /// 整体清空（FullClearOnly 实现的兜底）
    async fn clear_all(&self) -> anyhow::Result<()>;

    /// 后端名称（日志用）
    fn backend_name(&self) -> &'static str;
}

/// 根据配置构建去重缓存
///
/// Redis 不可达时退化为 null 缓存：采集继续工作，
/// 只是该批次内所有事件都按非 unique 处理。
pub async fn build_dedup_cache(config: &CacheConfig) -> Arc<dyn DedupCache> {
    match config.backend.as_str() {
        "redis" => {
            install_crypto_provider();
            match RedisDedupCache::new(&config.redis_url, &config.key_prefix) {
                Ok(cache) => {
                    info!("Dedup cache backend: redis ({})", config.redis_url);
                    Arc::new(cache)
                }
                Err(e) => {
                    warn!(
                        "Redis dedup cache unavailable ({}); degrading to null cache, \
                         all events will be counted as non-unique",
                        e
                    );
                    Arc::new(NullDedupCache)
                }
            }
        }
        "null" => {
            info!("Dedup cache backend: null (deduplication disabled)");
            Arc::new(NullDedupCache)
        }
        other => {
            if other != "memory" {
                warn!("Unknown cache backend '{}', using in-process memory", other);
            } else {
                info!("Dedup cache backend: memory");
            }
            Arc::new(MemoryDedupCache::new())
        }
    }
}

/// 安装进程级 rustls crypto provider
///
/// rediss:// 连接的 TLS 握手依赖它。重复调用无害，
/// 后续调用在已有 provider 时直接返回。
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// 去重缓存压缩清理
///
/// TTL 本身已保证过期键被回收，这个清理只是可选的后台保养。
/// 按能力分支：支持模式删除的只清 dedup 前缀，否则整体清空。
pub async fn compact_dedup_cache(cache: &dyn DedupCache) -> anyhow::Result<u64> {
    match cache.capability() {
        CacheCapability::PatternDelete => {
            let deleted = cache.purge_pattern("click:*").await?;
            info!(
                "Dedup cache compaction: {} keys purged ({})",
                deleted,
                cache.backend_name()
            );
            Ok(deleted)
        }
        CacheCapability::FullClearOnly => {
            cache.clear_all().await?;
            info!(
                "Dedup cache compaction: full clear ({})",
                cache.backend_name()
            );
            Ok(0)
        }
    }
}
