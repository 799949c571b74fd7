//! 原始交互事件实体（只追加，不修改）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub created_at: DateTimeUtc,
    pub event_type: String,
    pub promo_id: Option<i64>,
    pub store_id: Option<i64>,
    pub showcase_id: Option<i64>,
    /// 客户端会话标识，允许为空字符串（匿名会话无法去重）
    pub session_id: String,
    pub client_ip: String,
    #[sea_orm(column_type = "Text")]
    pub user_agent: String,
    #[sea_orm(column_type = "Text")]
    pub referrer: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    /// 写入时由去重检查计算，之后永不重算
    pub is_unique: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
