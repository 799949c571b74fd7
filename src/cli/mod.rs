//! 命令行入口
//!
//! `serve` 启动服务器 + 后台任务；其余子命令是一次性的
//! 维护操作（回填、清理、自动热门、缓存压缩），跑完即退出。

use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::analytics::{AutoHotUpdater, HourlyAggregator, RetentionCleanup};
use crate::api::server::run_server;
use crate::cache::{build_dedup_cache, compact_dedup_cache};
use crate::config::AppConfig;
use crate::storage::backend::SeaOrmStorage;

#[derive(Parser)]
#[command(name = "promotrack", version, about = "Promo directory behavioral analytics service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// 启动 HTTP 服务器和后台任务循环
    Serve,
    /// 一次性聚合回填（更宽的回看窗口）
    Aggregate {
        /// 回看天数
        #[arg(long, default_value_t = 1)]
        days: i64,
    },
    /// 一次性保留期清理
    Cleanup {
        /// 保留天数，缺省取配置值
        #[arg(long)]
        days: Option<u64>,
    },
    /// 一次性自动热门扫描
    AutoHot,
    /// 去重缓存压缩清理（尽力而为）
    CompactDedup,
}

/// 解析命令行并分发
pub async fn run(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Aggregate { days } => {
            let storage = Arc::new(SeaOrmStorage::new(&config.database).await?);
            let aggregator =
                HourlyAggregator::with_interval(storage, config.jobs.aggregate_interval_secs);
            let report = aggregator.run_backfill(Utc::now(), days).await?;
            info!(
                "Backfill done: {} events folded into {} groups (cursor: {})",
                report.events_scanned, report.groups_written, report.cursor
            );
            Ok(())
        }
        Command::Cleanup { days } => {
            let storage = Arc::new(SeaOrmStorage::new(&config.database).await?);
            let days = days.unwrap_or(config.analytics.retention_days);
            let deleted = RetentionCleanup::new(storage).run(Utc::now(), days).await?;
            info!("Cleanup done: {} events deleted", deleted);
            Ok(())
        }
        Command::AutoHot => {
            let storage = Arc::new(SeaOrmStorage::new(&config.database).await?);
            let updater = AutoHotUpdater::new(
                storage,
                config.analytics.hot_horizon_hours,
                config.analytics.usage_window_days,
            );
            let report = updater.run(Utc::now()).await?;
            info!(
                "Auto-hot done: {} flagged, {} unflagged",
                report.flagged, report.unflagged
            );
            Ok(())
        }
        Command::CompactDedup => {
            let cache = build_dedup_cache(&config.cache).await;
            let purged = compact_dedup_cache(cache.as_ref()).await?;
            info!("Dedup compaction done: {} keys purged", purged);
            Ok(())
        }
    }
}
