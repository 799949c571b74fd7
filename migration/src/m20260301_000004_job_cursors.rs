//! 任务游标表迁移

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JobCursors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobCursors::JobName)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(JobCursors::LastEventId)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(JobCursors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobCursors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobCursors {
    #[sea_orm(iden = "job_cursors")]
    Table,
    JobName,
    LastEventId,
    UpdatedAt,
}
