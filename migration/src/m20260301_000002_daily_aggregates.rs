//! 天级汇总表迁移
//!
//! daily_aggregates 的复合标识必须唯一，聚合任务依赖该唯一索引
//! 实现 ON CONFLICT 原子累加。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DailyAggregates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyAggregates::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DailyAggregates::Date).date().not_null())
                    .col(
                        ColumnDef::new(DailyAggregates::EventType)
                            .string_len(32)
                            .not_null(),
                    )
                    // 标识列用 0 表示“无引用”而不是 NULL：
                    // 唯一索引里 NULL 互不相等，会让 ON CONFLICT 累加失效
                    .col(
                        ColumnDef::new(DailyAggregates::PromoId)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyAggregates::StoreId)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyAggregates::ShowcaseId)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyAggregates::Count)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyAggregates::UniqueCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // 复合唯一索引：upsert 的冲突目标
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_daily_aggregates_identity")
                    .table(DailyAggregates::Table)
                    .col(DailyAggregates::Date)
                    .col(DailyAggregates::EventType)
                    .col(DailyAggregates::PromoId)
                    .col(DailyAggregates::StoreId)
                    .col(DailyAggregates::ShowcaseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 排序/统计查询按 (promo_id, date) 扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_daily_aggregates_promo_date")
                    .table(DailyAggregates::Table)
                    .col(DailyAggregates::PromoId)
                    .col(DailyAggregates::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_daily_aggregates_promo_date")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_daily_aggregates_identity")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DailyAggregates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DailyAggregates {
    #[sea_orm(iden = "daily_aggregates")]
    Table,
    Id,
    Date,
    EventType,
    PromoId,
    StoreId,
    ShowcaseId,
    Count,
    UniqueCount,
}
