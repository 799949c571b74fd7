//! 天级事件汇总实体
//!
//! 复合标识 (date, event_type, promo_id, store_id, showcase_id) 唯一，
//! 聚合任务通过原子累加 upsert 写入。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "daily_aggregates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub date: Date,
    pub event_type: String,
    /// 0 表示无促销码引用（NULL 在唯一索引中互不相等，无法做冲突目标）
    pub promo_id: i64,
    pub store_id: i64,
    pub showcase_id: i64,
    pub count: i64,
    /// 其中 is_unique = true 的事件数
    pub unique_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
