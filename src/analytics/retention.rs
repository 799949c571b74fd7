//! 原始事件保留期清理
//!
//! 分批删除超过保留期的 events 行，避免长事务锁表。
//! daily_aggregates 永不删除——历史汇总是长期资产。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::{debug, info, warn};

use crate::storage::backend::SeaOrmStorage;
use migration::entities::event;

/// 保留期清理任务
pub struct RetentionCleanup {
    storage: Arc<SeaOrmStorage>,
    /// 每批删除的行数
    batch_size: u64,
}

impl RetentionCleanup {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self {
            storage,
            batch_size: 10000,
        }
    }

    #[doc(hidden)]
    pub fn with_batch_size(storage: Arc<SeaOrmStorage>, batch_size: u64) -> Self {
        Self {
            storage,
            batch_size,
        }
    }

    /// 删除 created_at 严格早于 now - days 的事件，返回删除总数
    ///
    /// 中途失败留下部分删除是可接受的：下一轮会继续处理剩余行。
    pub async fn run(&self, now: DateTime<Utc>, days: u64) -> anyhow::Result<u64> {
        let db = self.storage.get_db();
        let cutoff = now - Duration::days(days as i64);

        let mut total_deleted = 0u64;
        let mut iterations = 0;
        let max_iterations = 1000; // 防止无限循环

        loop {
            if iterations >= max_iterations {
                warn!(
                    "Retention cleanup reached max iterations {} (deleted {} rows)",
                    max_iterations, total_deleted
                );
                break;
            }

            let ids_to_delete: Vec<i64> = event::Entity::find()
                .select_only()
                .column(event::Column::Id)
                .filter(event::Column::CreatedAt.lt(cutoff))
                .order_by_asc(event::Column::Id)
                .limit(self.batch_size)
                .into_tuple()
                .all(db)
                .await?;

            if ids_to_delete.is_empty() {
                break;
            }

            let deleted = event::Entity::delete_many()
                .filter(event::Column::Id.is_in(ids_to_delete))
                .exec(db)
                .await?
                .rows_affected;

            total_deleted += deleted;
            iterations += 1;

            debug!(
                "Retention cleanup batch {}: deleted {} rows (total {})",
                iterations, deleted, total_deleted
            );

            if deleted < self.batch_size {
                break;
            }

            // 批间短暂停顿，减轻数据库压力
            tokio::time::sleep(StdDuration::from_millis(100)).await;
        }

        info!(
            "Retention cleanup completed: {} events older than {} days deleted",
            total_deleted, days
        );

        Ok(total_deleted)
    }
}
