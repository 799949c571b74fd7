//! 自动热门任务
//!
//! 两遍单调收敛：先摘掉不再满足条件的热门标志，
//! 再给即将到期且近期有使用量的促销码挂上标志。
//! 任意一遍部分完成都不破坏不变式，下一轮继续收敛。
//! 每条语句走统一的重试执行器，瞬时错误退避后重试。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, EntityTrait, QueryFilter,
};
use tracing::{debug, info};

use crate::analytics::usage::promo_usage_totals;
use crate::storage::backend::SeaOrmStorage;
use crate::storage::backend::retry;
use migration::entities::promo_code;

/// 自动热门扫描报告
#[derive(Debug, Default)]
pub struct AutoHotReport {
    /// 本轮摘掉热门标志的数量
    pub unflagged: u64,
    /// 本轮新挂热门标志的数量
    pub flagged: u64,
}

/// 自动热门任务
pub struct AutoHotUpdater {
    storage: Arc<SeaOrmStorage>,
    /// 候选窗口：到期时间在 now + horizon 内
    horizon_hours: i64,
    /// 使用量统计窗口（天）
    usage_window_days: i64,
}

impl AutoHotUpdater {
    pub fn new(storage: Arc<SeaOrmStorage>, horizon_hours: i64, usage_window_days: i64) -> Self {
        Self {
            storage,
            horizon_hours,
            usage_window_days,
        }
    }

    /// 执行一轮扫描
    pub async fn run(&self, now: DateTime<Utc>) -> anyhow::Result<AutoHotReport> {
        let db = self.storage.get_db();
        let retry_config = self.storage.retry_config();
        let horizon = now + Duration::hours(self.horizon_hours);

        // 第一遍：摘掉不满足候选条件的热门标志。
        // 条件：已下架、已过期、无到期时间、或到期在窗口之外。
        let disqualify = Condition::any()
            .add(promo_code::Column::IsActive.eq(false))
            .add(promo_code::Column::ExpiresAt.is_null())
            .add(promo_code::Column::ExpiresAt.lte(now))
            .add(promo_code::Column::ExpiresAt.gt(horizon));

        let unflagged = retry::with_retry("auto_hot_unflag", retry_config, || {
            let disqualify = disqualify.clone();
            async move {
                promo_code::Entity::update_many()
                    .col_expr(
                        promo_code::Column::IsHot,
                        sea_orm::sea_query::Expr::value(false),
                    )
                    .filter(promo_code::Column::IsHot.eq(true))
                    .filter(disqualify)
                    .exec(db)
                    .await
            }
        })
        .await?
        .rows_affected;

        // 第二遍：候选 = 上架、未过期、窗口内到期且尚未热门；
        // 近期使用量 > 0 的挂标志。
        let candidates: Vec<promo_code::Model> =
            retry::with_retry("auto_hot_candidates", retry_config, || {
                promo_code::Entity::find()
                    .filter(promo_code::Column::IsActive.eq(true))
                    .filter(promo_code::Column::IsHot.eq(false))
                    .filter(promo_code::Column::ExpiresAt.gt(now))
                    .filter(promo_code::Column::ExpiresAt.lte(horizon))
                    .all(db)
            })
            .await?;

        let flagged = if candidates.is_empty() {
            0
        } else {
            let usage = retry::with_retry("auto_hot_usage", retry_config, || {
                promo_usage_totals(db, now, self.usage_window_days)
            })
            .await?;

            let to_flag: Vec<i64> = candidates
                .iter()
                .filter(|p| usage.get(&p.id).copied().unwrap_or(0) > 0)
                .map(|p| p.id)
                .collect();

            if to_flag.is_empty() {
                0
            } else {
                retry::with_retry("auto_hot_flag", retry_config, || {
                    let ids = to_flag.clone();
                    async move {
                        promo_code::Entity::update_many()
                            .set(promo_code::ActiveModel {
                                is_hot: Set(true),
                                ..Default::default()
                            })
                            .filter(promo_code::Column::Id.is_in(ids))
                            .exec(db)
                            .await
                    }
                })
                .await?
                .rows_affected
            }
        };

        if unflagged > 0 || flagged > 0 {
            info!(
                "Auto-hot sweep: {} flagged, {} unflagged (horizon: {}h)",
                flagged, unflagged, self.horizon_hours
            );
        } else {
            debug!("Auto-hot sweep: no changes");
        }

        Ok(AutoHotReport { unflagged, flagged })
    }
}
