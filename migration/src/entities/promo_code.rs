//! 促销码目录只读视图实体
//!
//! 目录 CRUD 由外部系统维护，本服务只读取排序所需字段，
//! 并且仅在自动热门任务中翻转 is_hot 标志。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "promo_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub code: String,
    pub store_id: Option<i64>,
    pub is_hot: bool,
    pub is_recommended: bool,
    pub is_active: bool,
    pub expires_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
