pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260301_000001_events;
mod m20260301_000002_daily_aggregates;
mod m20260301_000003_promo_codes;
mod m20260301_000004_job_cursors;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_events::Migration),
            Box::new(m20260301_000002_daily_aggregates::Migration),
            Box::new(m20260301_000003_promo_codes::Migration),
            Box::new(m20260301_000004_job_cursors::Migration),
        ]
    }
}
