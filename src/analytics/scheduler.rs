//! 后台任务调度
//!
//! 任务本体只暴露 `run(now)`，这里统一负责节奏和时间预算：
//! 超出软预算记 warn，超出硬预算直接终止本次运行。
//! 单次失败只记日志，下一个周期照常触发。

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, warn};

use crate::analytics::{AutoHotUpdater, HourlyAggregator, RetentionCleanup};
use crate::cache::{DedupCache, compact_dedup_cache};
use crate::config::AppConfig;
use crate::storage::backend::SeaOrmStorage;

/// 周期性运行一个任务
///
/// 任务闭包返回一行摘要用于日志；错误和超时都不会终止循环。
pub fn spawn_interval_job<F, Fut>(
    name: &'static str,
    period: Duration,
    soft_budget: Duration,
    hard_budget: Duration,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 首个 tick 立即返回，跳过以免启动即运行
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let started = Instant::now();
            match timeout(hard_budget, job()).await {
                Ok(Ok(summary)) => {
                    let elapsed = started.elapsed();
                    if elapsed > soft_budget {
                        warn!(
                            "Job '{}' exceeded soft budget: {:?} (budget: {:?})",
                            name, elapsed, soft_budget
                        );
                    }
                    debug!("Job '{}' finished in {:?}: {}", name, elapsed, summary);
                }
                Ok(Err(e)) => {
                    error!("Job '{}' failed: {:#}", name, e);
                }
                Err(_) => {
                    error!(
                        "Job '{}' exceeded hard budget {:?}, run aborted",
                        name, hard_budget
                    );
                }
            }
        }
    })
}

/// 启动全部后台任务循环
pub fn start_background_jobs(
    storage: Arc<SeaOrmStorage>,
    cache: Arc<dyn DedupCache>,
    config: Arc<AppConfig>,
) -> Vec<JoinHandle<()>> {
    let jobs = &config.jobs;
    let soft = Duration::from_secs(jobs.soft_budget_secs);
    let hard = Duration::from_secs(jobs.hard_budget_secs);

    let mut handles = Vec::new();

    // 聚合任务
    {
        let aggregator = Arc::new(HourlyAggregator::with_interval(
            storage.clone(),
            jobs.aggregate_interval_secs,
        ));
        handles.push(spawn_interval_job(
            "aggregate",
            Duration::from_secs(jobs.aggregate_interval_secs),
            soft,
            hard,
            move || {
                let aggregator = aggregator.clone();
                async move {
                    let report = aggregator.run(Utc::now()).await?;
                    Ok(format!(
                        "{} events, {} groups",
                        report.events_scanned, report.groups_written
                    ))
                }
            },
        ));
    }

    // 保留期清理
    {
        let cleanup = Arc::new(RetentionCleanup::new(storage.clone()));
        let retention_days = config.analytics.retention_days;
        handles.push(spawn_interval_job(
            "cleanup",
            Duration::from_secs(jobs.cleanup_interval_secs),
            soft,
            hard,
            move || {
                let cleanup = cleanup.clone();
                async move {
                    let deleted = cleanup.run(Utc::now(), retention_days).await?;
                    Ok(format!("{} events deleted", deleted))
                }
            },
        ));
    }

    // 自动热门
    {
        let updater = Arc::new(AutoHotUpdater::new(
            storage.clone(),
            config.analytics.hot_horizon_hours,
            config.analytics.usage_window_days,
        ));
        handles.push(spawn_interval_job(
            "auto_hot",
            Duration::from_secs(jobs.auto_hot_interval_secs),
            soft,
            hard,
            move || {
                let updater = updater.clone();
                async move {
                    let report = updater.run(Utc::now()).await?;
                    Ok(format!(
                        "{} flagged, {} unflagged",
                        report.flagged, report.unflagged
                    ))
                }
            },
        ));
    }

    // 去重缓存压缩（尽力而为）
    {
        let cache = cache.clone();
        handles.push(spawn_interval_job(
            "dedup_compact",
            Duration::from_secs(jobs.dedup_compact_interval_secs),
            soft,
            hard,
            move || {
                let cache = cache.clone();
                async move {
                    let purged = compact_dedup_cache(cache.as_ref()).await?;
                    Ok(format!("{} keys purged", purged))
                }
            },
        ));
    }

    info!("Background jobs started: aggregate, cleanup, auto_hot, dedup_compact");

    handles
}
