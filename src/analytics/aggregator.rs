//! 小时聚合任务
//!
//! 周期性把新到的原始事件折叠进 daily_aggregates。
//! 增量边界用高水位游标（已处理的最大事件 id）控制，
//! 时间回看窗口只是晚到写入的安全界，不再承担去重职责，
//! 因此窗口重叠不会重复计数。
//! 汇总累加和游标推进在同一个事务里提交：二者要么一起生效，
//! 要么一起回滚，中途失败不会留下已累加但游标未动的状态。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait, sea_query::OnConflict,
};
use tracing::{debug, info};

use crate::analytics::aggregate_writer::{AggregateRow, DailyAggregateWriter};
use crate::analytics::{AggregateKey, EventType};
use crate::storage::backend::SeaOrmStorage;
use crate::storage::backend::retry;
use migration::entities::{event, job_cursor};

/// 聚合任务的游标名
const CURSOR_NAME: &str = "hourly_aggregate";

/// 折叠事务单次尝试的时间上限（毫秒）。
/// 超时回滚后按可重试错误处理，不占满调度器的硬预算。
const FOLD_ATTEMPT_TIMEOUT_MS: u64 = 60_000;

/// 单次聚合报告
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// 本次扫描的事件数
    pub events_scanned: usize,
    /// 写入/累加的汇总分组数
    pub groups_written: usize,
    /// 运行结束后的游标位置
    pub cursor: i64,
}

/// 小时聚合任务
pub struct HourlyAggregator {
    storage: Arc<SeaOrmStorage>,
    /// 回看窗口（晚到写入的安全界，默认为调度周期的 2 倍）
    lookback: Duration,
}

impl HourlyAggregator {
    pub fn new(storage: Arc<SeaOrmStorage>, lookback: Duration) -> Self {
        Self { storage, lookback }
    }

    /// 按调度周期构造（回看 = 2 × 周期）
    pub fn with_interval(storage: Arc<SeaOrmStorage>, interval_secs: u64) -> Self {
        Self::new(storage, Duration::seconds((interval_secs * 2) as i64))
    }

    /// 执行一轮聚合
    ///
    /// 重复运行是无害的：没有新事件时游标不动、汇总不变。
    pub async fn run(&self, now: DateTime<Utc>) -> anyhow::Result<AggregateReport> {
        self.run_with_lookback(now, self.lookback).await
    }

    /// 手动回填：用 N 天回看窗口跑同一套折叠
    pub async fn run_backfill(
        &self,
        now: DateTime<Utc>,
        days: i64,
    ) -> anyhow::Result<AggregateReport> {
        self.run_with_lookback(now, Duration::days(days)).await
    }

    async fn run_with_lookback(
        &self,
        now: DateTime<Utc>,
        lookback: Duration,
    ) -> anyhow::Result<AggregateReport> {
        let db = self.storage.get_db();
        let retry_config = self.storage.retry_config();
        let cursor = self.load_cursor().await?;
        let window_start = now - lookback;

        let events: Vec<event::Model> =
            retry::with_retry("aggregator_scan_events", retry_config, || {
                event::Entity::find()
                    .filter(event::Column::CreatedAt.gte(window_start))
                    .filter(event::Column::Id.gt(cursor))
                    .order_by_asc(event::Column::Id)
                    .all(db)
            })
            .await?;

        if events.is_empty() {
            debug!("Aggregation pass: no new events (cursor: {})", cursor);
            return Ok(AggregateReport {
                cursor,
                ..Default::default()
            });
        }

        let max_id = events.last().map(|e| e.id).unwrap_or(cursor);

        // 内存分组：(事件日期, 分组标识) -> (总数, unique 数)
        let mut groups: HashMap<(NaiveDate, AggregateKey), (i64, i64)> = HashMap::new();
        let mut unparseable = 0usize;

        for ev in &events {
            // 库里只会有入库时验证过的类型，这里的防御只为脏数据
            let Some(event_type) = EventType::parse(&ev.event_type) else {
                unparseable += 1;
                continue;
            };

            let key = AggregateKey::new(event_type, ev.promo_id, ev.store_id, ev.showcase_id);
            let entry = groups.entry((ev.created_at.date_naive(), key)).or_insert((0, 0));
            entry.0 += 1;
            if ev.is_unique {
                entry.1 += 1;
            }
        }

        if unparseable > 0 {
            debug!("Aggregation pass: {} rows with unknown event_type ignored", unparseable);
        }

        let rows: Vec<AggregateRow> = groups
            .into_iter()
            .map(|((date, key), (count, unique_count))| AggregateRow {
                date,
                key,
                count,
                unique_count,
            })
            .collect();

        // 汇总累加 + 游标推进：一个事务，整体重试。
        // 失败回滚后游标不动，下一轮重新折叠同一批事件不会双计。
        let rows_ref = &rows;
        retry::with_retry_timeout(
            "aggregator_fold",
            retry_config,
            FOLD_ATTEMPT_TIMEOUT_MS,
            || async move {
                let txn = db.begin().await?;
                DailyAggregateWriter::new(&txn)
                    .upsert_rows(rows_ref, "aggregator")
                    .await?;
                Self::write_cursor(&txn, max_id, now).await?;
                txn.commit().await?;
                Ok(())
            },
        )
        .await?;

        info!(
            "Aggregation pass completed: {} events folded into {} groups (cursor {} -> {})",
            events.len(),
            rows.len(),
            cursor,
            max_id
        );

        Ok(AggregateReport {
            events_scanned: events.len(),
            groups_written: rows.len(),
            cursor: max_id,
        })
    }

    /// 读取游标，不存在视为 0（从头处理回看窗口内的事件）
    async fn load_cursor(&self) -> anyhow::Result<i64> {
        let db = self.storage.get_db();
        let row = retry::with_retry("aggregator_load_cursor", self.storage.retry_config(), || {
            job_cursor::Entity::find_by_id(CURSOR_NAME.to_string()).one(db)
        })
        .await?;
        Ok(row.map(|r| r.last_event_id).unwrap_or(0))
    }

    /// 游标推进到本轮访问过的最大事件 id（与汇总同事务执行）
    async fn write_cursor<C: ConnectionTrait>(
        db: &C,
        last_event_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let model = job_cursor::ActiveModel {
            job_name: Set(CURSOR_NAME.to_string()),
            last_event_id: Set(last_event_id),
            updated_at: Set(now),
        };

        let on_conflict = OnConflict::column(job_cursor::Column::JobName)
            .update_columns([
                job_cursor::Column::LastEventId,
                job_cursor::Column::UpdatedAt,
            ])
            .to_owned();

        // 主键非自增，跳过 last_insert_id 提取
        job_cursor::Entity::insert(model)
            .on_conflict(on_conflict)
            .exec_without_returning(db)
            .await?;

        Ok(())
    }
}
