//! 促销码目录视图表迁移
//!
//! 目录本体由外部系统维护，这里只建本服务读取和
//! 自动热门任务更新所需的最小字段集与索引。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PromoCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromoCodes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::Title)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::Code)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(PromoCodes::StoreId).big_integer().null())
                    .col(
                        ColumnDef::new(PromoCodes::IsHot)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::IsRecommended)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PromoCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 自动热门任务按 (is_active, expires_at) 扫描候选集
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promo_codes_active_expires")
                    .table(PromoCodes::Table)
                    .col(PromoCodes::IsActive)
                    .col(PromoCodes::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        // 默认排序 (-is_recommended, -is_hot, -created_at) 的覆盖索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promo_codes_badges_created")
                    .table(PromoCodes::Table)
                    .col(PromoCodes::IsRecommended)
                    .col(PromoCodes::IsHot)
                    .col(PromoCodes::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_promo_codes_badges_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_promo_codes_active_expires")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(PromoCodes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PromoCodes {
    #[sea_orm(iden = "promo_codes")]
    Table,
    Id,
    Title,
    Code,
    StoreId,
    IsHot,
    IsRecommended,
    IsActive,
    ExpiresAt,
    CreatedAt,
}
