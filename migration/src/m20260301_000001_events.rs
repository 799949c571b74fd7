//! 原始事件表迁移
//!
//! 创建 events 表，存储单条用户交互事件（view/copy/open 等），
//! 以及聚合和清理任务依赖的时间索引。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Events::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Events::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Events::EventType).string_len(32).not_null())
                    .col(ColumnDef::new(Events::PromoId).big_integer().null())
                    .col(ColumnDef::new(Events::StoreId).big_integer().null())
                    .col(ColumnDef::new(Events::ShowcaseId).big_integer().null())
                    .col(
                        ColumnDef::new(Events::SessionId)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Events::ClientIp)
                            .string_len(45)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Events::UserAgent).text().not_null())
                    .col(ColumnDef::new(Events::Referrer).text().not_null())
                    .col(
                        ColumnDef::new(Events::UtmSource)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Events::UtmMedium)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Events::UtmCampaign)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Events::IsUnique)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // created_at 索引（清理任务按时间范围删除）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_created_at")
                    .table(Events::Table)
                    .col(Events::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 复合索引（聚合任务按类型 + 时间扫描）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_type_time")
                    .table(Events::Table)
                    .col(Events::EventType)
                    .col(Events::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 复合索引（单促销码时间序列查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_promo_time")
                    .table(Events::Table)
                    .col(Events::PromoId)
                    .col(Events::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_events_promo_time").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_events_type_time").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_events_created_at").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Events {
    #[sea_orm(iden = "events")]
    Table,
    Id,
    CreatedAt,
    EventType,
    PromoId,
    StoreId,
    ShowcaseId,
    SessionId,
    ClientIp,
    UserAgent,
    Referrer,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    IsUnique,
}
