//! 天级汇总写入器
//!
//! 批量 upsert 进 daily_aggregates：冲突时对 count / unique_count
//! 原子累加，全程不做读-改-写，并发安全。
//! 不在这里做重试：调用方把整个折叠（含游标推进）放进一个
//! 事务并整体重试。

use chrono::NaiveDate;
use sea_orm::{
    ActiveValue::Set,
    ConnectionTrait, DatabaseBackend, EntityTrait, ExprTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;

use crate::analytics::AggregateKey;
use migration::entities::daily_aggregate;

/// 一条待累加的汇总行
#[derive(Debug, Clone)]
pub struct AggregateRow {
    pub date: NaiveDate,
    pub key: AggregateKey,
    pub count: i64,
    pub unique_count: i64,
}

/// 天级汇总写入器
pub struct DailyAggregateWriter<'a, C: ConnectionTrait> {
    db: &'a C,
}

// 单条语句的行数上限，避免超出 SQL 绑定变量限制
const UPSERT_CHUNK_SIZE: usize = 200;

impl<'a, C: ConnectionTrait> DailyAggregateWriter<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// 批量累加汇总行
    ///
    /// 同一 (date, event_type, promo, store, showcase) 已存在则
    /// count += 新值、unique_count += 新值，否则插入新行。
    pub async fn upsert_rows(
        &self,
        rows: &[AggregateRow],
        op_prefix: &str,
    ) -> Result<(), sea_orm::DbErr> {
        if rows.is_empty() {
            return Ok(());
        }

        let backend = self.db.get_database_backend();

        for chunk in rows.chunks(UPSERT_CHUNK_SIZE) {
            self.batch_upsert(chunk, backend).await?;
        }

        debug!(
            "[{}] Daily aggregates updated: {} groups",
            op_prefix,
            rows.len()
        );

        Ok(())
    }

    async fn batch_upsert(
        &self,
        rows: &[AggregateRow],
        backend: DatabaseBackend,
    ) -> Result<(), sea_orm::DbErr> {
        let models: Vec<daily_aggregate::ActiveModel> = rows
            .iter()
            .map(|row| daily_aggregate::ActiveModel {
                date: Set(row.date),
                event_type: Set(row.key.event_type.to_string()),
                promo_id: Set(row.key.promo_id),
                store_id: Set(row.key.store_id),
                showcase_id: Set(row.key.showcase_id),
                count: Set(row.count),
                unique_count: Set(row.unique_count),
                ..Default::default()
            })
            .collect();

        let identity = [
            daily_aggregate::Column::Date,
            daily_aggregate::Column::EventType,
            daily_aggregate::Column::PromoId,
            daily_aggregate::Column::StoreId,
            daily_aggregate::Column::ShowcaseId,
        ];

        // SQLite/PostgreSQL: count = count + excluded.count
        // MySQL: count = count + VALUES(count)
        let on_conflict = match backend {
            DatabaseBackend::MySql => OnConflict::columns(identity)
                .value(
                    daily_aggregate::Column::Count,
                    Expr::col(daily_aggregate::Column::Count).add(Expr::cust("VALUES(count)")),
                )
                .value(
                    daily_aggregate::Column::UniqueCount,
                    Expr::col(daily_aggregate::Column::UniqueCount)
                        .add(Expr::cust("VALUES(unique_count)")),
                )
                .to_owned(),
            _ => OnConflict::columns(identity)
                .value(
                    daily_aggregate::Column::Count,
                    Expr::col(daily_aggregate::Column::Count).add(Expr::cust("excluded.count")),
                )
                .value(
                    daily_aggregate::Column::UniqueCount,
                    Expr::col(daily_aggregate::Column::UniqueCount)
                        .add(Expr::cust("excluded.unique_count")),
                )
                .to_owned(),
        };

        daily_aggregate::Entity::insert_many(models)
            .on_conflict(on_conflict)
            .exec(self.db)
            .await?;

        Ok(())
    }
}
