//! 汇总读取查询
//!
//! 排序和统计端点只读 daily_aggregates，查询期绝不扫原始事件表。

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::analytics::click_event_type_strings;
use migration::entities::daily_aggregate;

/// 滚动窗口内每个促销码的使用量（点击类事件计数之和）
///
/// 返回 promo_id -> usage。窗口内无记录的促销码不出现在结果里，
/// 调用方按 0 处理。
pub async fn promo_usage_totals<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
    window_days: i64,
) -> Result<HashMap<i64, i64>, DbErr> {
    let cutoff = (now - Duration::days(window_days)).date_naive();

    let rows: Vec<(i64, Option<i64>)> = daily_aggregate::Entity::find()
        .select_only()
        .column(daily_aggregate::Column::PromoId)
        .column_as(daily_aggregate::Column::Count.sum(), "total")
        .filter(daily_aggregate::Column::Date.gte(cutoff))
        .filter(daily_aggregate::Column::EventType.is_in(click_event_type_strings()))
        .filter(daily_aggregate::Column::PromoId.ne(0))
        .group_by(daily_aggregate::Column::PromoId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(promo_id, total)| (promo_id, total.unwrap_or(0)))
        .collect())
}

/// 窗口内使用量最高的促销码（点击类事件）
pub async fn top_promos<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
    window_days: i64,
    limit: u64,
) -> Result<Vec<(i64, i64)>, DbErr> {
    let cutoff = (now - Duration::days(window_days)).date_naive();

    let rows: Vec<(i64, Option<i64>)> = daily_aggregate::Entity::find()
        .select_only()
        .column(daily_aggregate::Column::PromoId)
        .column_as(daily_aggregate::Column::Count.sum(), "total")
        .filter(daily_aggregate::Column::Date.gte(cutoff))
        .filter(daily_aggregate::Column::EventType.is_in(click_event_type_strings()))
        .filter(daily_aggregate::Column::PromoId.ne(0))
        .group_by(daily_aggregate::Column::PromoId)
        .order_by_desc(daily_aggregate::Column::Count.sum())
        .limit(limit)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(promo_id, total)| (promo_id, total.unwrap_or(0)))
        .collect())
}

/// 窗口内活动量最高的店铺（全部事件类型）
pub async fn top_stores<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
    window_days: i64,
    limit: u64,
) -> Result<Vec<(i64, i64)>, DbErr> {
    let cutoff = (now - Duration::days(window_days)).date_naive();

    let rows: Vec<(i64, Option<i64>)> = daily_aggregate::Entity::find()
        .select_only()
        .column(daily_aggregate::Column::StoreId)
        .column_as(daily_aggregate::Column::Count.sum(), "total")
        .filter(daily_aggregate::Column::Date.gte(cutoff))
        .filter(daily_aggregate::Column::StoreId.ne(0))
        .group_by(daily_aggregate::Column::StoreId)
        .order_by_desc(daily_aggregate::Column::Count.sum())
        .limit(limit)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(store_id, total)| (store_id, total.unwrap_or(0)))
        .collect())
}
