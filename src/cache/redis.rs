//! Redis 去重缓存
//!
//! 使用 SET NX EX 实现原子的 set-if-absent：并发请求携带相同会话时
//! 只有一个能拿到 unique，这个原子性必须由缓存层保证。

use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use super::{CacheCapability, DedupCache};

pub struct RedisDedupCache {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisDedupCache {
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, String> {
        let client = redis::Client::open(url.to_string())
            .map_err(|e| format!("Failed to create Redis client: {e}"))?;

        // 启动时用同步连接做一次 PING，尽早暴露配置错误
        match client.get_connection() {
            Ok(mut conn) => match redis::cmd("PING").query::<String>(&mut conn) {
                Ok(response) => {
                    debug!("Redis connection test successful: {}", response);
                }
                Err(e) => {
                    error!("Failed to ping Redis server: {}. Check URL: {}", e, url);
                    return Err(format!("Redis ping failed: {e}"));
                }
            },
            Err(e) => {
                error!("Failed to connect to Redis: {}. Check URL: {}", e, url);
                return Err(format!("Redis connection failed: {e}"));
            }
        }

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: key_prefix.to_string(),
        })
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait::async_trait]
impl DedupCache for RedisDedupCache {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> bool {
        let redis_key = self.make_key(key);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                // 缓存故障降级：按非 unique 处理，不阻塞采集
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return false;
            }
        };

        // SET key 1 NX EX ttl：仅当键不存在时写入
        let result: redis::RedisResult<Option<String>> = redis::cmd("SET")
            .arg(&redis_key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await;

        match result {
            Ok(Some(_)) => {
                trace!("Dedup key set: {}", key);
                true
            }
            Ok(None) => {
                trace!("Dedup key already present: {}", key);
                false
            }
            Err(e) => {
                error!("Redis SET NX failed for '{}': {}", key, e);
                self.reset_connection().await;
                false
            }
        }
    }

    fn capability(&self) -> CacheCapability {
        CacheCapability::PatternDelete
    }

    async fn purge_pattern(&self, pattern: &str) -> anyhow::Result<u64> {
        let mut conn = self.get_connection().await.map_err(|e| {
            anyhow::anyhow!("Failed to get Redis connection for purge: {}", e)
        })?;

        let full_pattern = self.make_key(pattern);
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        // SCAN 分批遍历，避免 KEYS 阻塞 Redis
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&full_pattern)
                .arg("COUNT")
                .arg(500)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let removed: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await?;
                deleted += removed;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("Purged {} keys matching '{}'", deleted, full_pattern);
        Ok(deleted)
    }

    async fn clear_all(&self) -> anyhow::Result<()> {
        // 支持模式删除，整体清空只清本服务前缀
        self.purge_pattern("*").await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
