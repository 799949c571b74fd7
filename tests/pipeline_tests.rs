//! 分析管线集成测试
//!
//! 覆盖采集（含去重标记）、小时聚合（游标增量）、
//! 保留期清理和自动热门扫描，全部跑在临时 SQLite 上。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use tempfile::TempDir;

use migration::entities::{daily_aggregate, event, job_cursor, promo_code};
use promotrack::analytics::{
    AutoHotUpdater, EventDraft, HourlyAggregator, IngestService, RetentionCleanup, TrackPayload,
};
use promotrack::cache::{DedupCache, MemoryDedupCache, NullDedupCache};
use promotrack::config::{AppConfig, DatabaseConfig};
use promotrack::storage::backend::SeaOrmStorage;

// =============================================================================
// 测试基础设施
// =============================================================================

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let td = TempDir::new().unwrap();
    let p = td.path().join("test.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", p.display()),
        ..Default::default()
    };
    let s = SeaOrmStorage::new(&config).await.unwrap();
    (Arc::new(s), td)
}

fn test_config() -> Arc<AppConfig> {
    Arc::new(AppConfig::default())
}

fn draft(event_type: &str, promo_id: Option<i64>, session_id: &str) -> EventDraft {
    serde_json::from_value(serde_json::json!({
        "event_type": event_type,
        "promo_id": promo_id,
        "session_id": session_id,
    }))
    .unwrap()
}

async fn insert_event(
    storage: &SeaOrmStorage,
    event_type: &str,
    promo_id: Option<i64>,
    created_at: DateTime<Utc>,
    is_unique: bool,
) {
    let model = event::ActiveModel {
        created_at: Set(created_at),
        event_type: Set(event_type.to_string()),
        promo_id: Set(promo_id),
        store_id: Set(None),
        showcase_id: Set(None),
        session_id: Set("sess".to_string()),
        client_ip: Set("127.0.0.1".to_string()),
        user_agent: Set(String::new()),
        referrer: Set(String::new()),
        utm_source: Set(String::new()),
        utm_medium: Set(String::new()),
        utm_campaign: Set(String::new()),
        is_unique: Set(is_unique),
        ..Default::default()
    };
    event::Entity::insert(model)
        .exec(storage.get_db())
        .await
        .unwrap();
}

async fn insert_promo(
    storage: &SeaOrmStorage,
    title: &str,
    is_hot: bool,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
) -> i64 {
    let model = promo_code::ActiveModel {
        title: Set(title.to_string()),
        code: Set(title.to_uppercase()),
        store_id: Set(None),
        is_hot: Set(is_hot),
        is_recommended: Set(false),
        is_active: Set(is_active),
        expires_at: Set(expires_at),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    promo_code::Entity::insert(model)
        .exec(storage.get_db())
        .await
        .unwrap()
        .last_insert_id
}

async fn insert_aggregate(
    storage: &SeaOrmStorage,
    date: chrono::NaiveDate,
    event_type: &str,
    promo_id: i64,
    count: i64,
) {
    let model = daily_aggregate::ActiveModel {
        date: Set(date),
        event_type: Set(event_type.to_string()),
        promo_id: Set(promo_id),
        store_id: Set(0),
        showcase_id: Set(0),
        count: Set(count),
        unique_count: Set(count),
        ..Default::default()
    };
    daily_aggregate::Entity::insert(model)
        .exec(storage.get_db())
        .await
        .unwrap();
}

// =============================================================================
// 采集测试
// =============================================================================

mod ingest_tests {
    use super::*;

    fn ingest_service(
        storage: Arc<SeaOrmStorage>,
        cache: Arc<dyn DedupCache>,
    ) -> IngestService {
        IngestService::new(storage, cache, test_config())
    }

    #[tokio::test]
    async fn test_valid_events_stored_unknown_skipped() {
        let (storage, _td) = create_temp_storage().await;
        let service = ingest_service(storage.clone(), Arc::new(MemoryDedupCache::new()));

        let payload = TrackPayload {
            events: vec![
                draft("copy", Some(1), "s1"),
                draft("view", Some(1), "s1"),
                draft("purchase", Some(1), "s1"), // 未知类型
            ],
        };

        let report = service.ingest(payload, "1.2.3.4", "test-agent").await.unwrap();
        assert_eq!(report.stored, 2);
        assert_eq!(report.skipped, 1);

        let rows = event::Entity::find().all(storage.get_db()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.client_ip == "1.2.3.4"));
        assert!(rows.iter().all(|r| r.user_agent == "test-agent"));
    }

    #[tokio::test]
    async fn test_legacy_alias_stored_canonical() {
        let (storage, _td) = create_temp_storage().await;
        let service = ingest_service(storage.clone(), Arc::new(MemoryDedupCache::new()));

        let payload = TrackPayload {
            events: vec![draft("promo_copy", Some(1), "s1")],
        };
        service.ingest(payload, "1.2.3.4", "").await.unwrap();

        let rows = event::Entity::find().all(storage.get_db()).await.unwrap();
        assert_eq!(rows[0].event_type, "copy");
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let (storage, _td) = create_temp_storage().await;
        let service = ingest_service(storage, Arc::new(MemoryDedupCache::new()));

        let result = service
            .ingest(TrackPayload { events: vec![] }, "1.2.3.4", "")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let (storage, _td) = create_temp_storage().await;
        let service = ingest_service(storage, Arc::new(MemoryDedupCache::new()));

        let events: Vec<EventDraft> = (0..101).map(|_| draft("copy", Some(1), "s")).collect();
        let result = service.ingest(TrackPayload { events }, "1.2.3.4", "").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dedup_same_session_one_unique_both_stored() {
        let (storage, _td) = create_temp_storage().await;
        let service = ingest_service(storage.clone(), Arc::new(MemoryDedupCache::new()));

        // 同一会话一分钟内两次点击：两条都入库，只有一条 unique
        for _ in 0..2 {
            let payload = TrackPayload {
                events: vec![draft("copy", Some(42), "session-a")],
            };
            service.ingest(payload, "1.2.3.4", "").await.unwrap();
        }

        let rows = event::Entity::find().all(storage.get_db()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.iter().filter(|r| r.is_unique).count(), 1);
    }

    #[tokio::test]
    async fn test_dedup_distinct_sessions_both_unique() {
        let (storage, _td) = create_temp_storage().await;
        let service = ingest_service(storage.clone(), Arc::new(MemoryDedupCache::new()));

        let payload = TrackPayload {
            events: vec![
                draft("copy", Some(42), "session-a"),
                draft("copy", Some(42), "session-b"),
            ],
        };
        let report = service.ingest(payload, "1.2.3.4", "").await.unwrap();
        assert_eq!(report.unique, 2);
    }

    #[tokio::test]
    async fn test_empty_session_never_unique() {
        let (storage, _td) = create_temp_storage().await;
        let service = ingest_service(storage.clone(), Arc::new(MemoryDedupCache::new()));

        let payload = TrackPayload {
            events: vec![draft("copy", Some(42), ""), draft("copy", Some(42), "  ")],
        };
        let report = service.ingest(payload, "1.2.3.4", "").await.unwrap();
        assert_eq!(report.stored, 2);
        assert_eq!(report.unique, 0);
    }

    #[tokio::test]
    async fn test_cache_unavailable_degrades_to_non_unique() {
        let (storage, _td) = create_temp_storage().await;
        // null 缓存模拟缓存不可用：set_if_absent 永远 false
        let service = ingest_service(storage.clone(), Arc::new(NullDedupCache));

        let payload = TrackPayload {
            events: vec![draft("copy", Some(42), "session-a")],
        };
        let report = service.ingest(payload, "1.2.3.4", "").await.unwrap();
        assert_eq!(report.stored, 1);
        assert_eq!(report.unique, 0);
    }

    #[tokio::test]
    async fn test_dedup_window_expiry_allows_unique_again() {
        let cache = MemoryDedupCache::new();
        let ttl = StdDuration::from_millis(100);

        assert!(cache.set_if_absent("click:copy:1:s", ttl).await);
        assert!(!cache.set_if_absent("click:copy:1:s", ttl).await);

        tokio::time::sleep(StdDuration::from_millis(300)).await;
        assert!(cache.set_if_absent("click:copy:1:s", ttl).await);
    }
}

// =============================================================================
// 聚合测试
// =============================================================================

mod aggregator_tests {
    use super::*;

    #[tokio::test]
    async fn test_events_folded_into_daily_groups() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        insert_event(&storage, "copy", Some(1), now - Duration::minutes(10), true).await;
        insert_event(&storage, "copy", Some(1), now - Duration::minutes(9), false).await;
        insert_event(&storage, "view", Some(1), now - Duration::minutes(8), true).await;

        let aggregator = HourlyAggregator::with_interval(storage.clone(), 3600);
        let report = aggregator.run(now).await.unwrap();
        assert_eq!(report.events_scanned, 3);
        assert_eq!(report.groups_written, 2);

        let copy_row = daily_aggregate::Entity::find()
            .filter(daily_aggregate::Column::EventType.eq("copy"))
            .one(storage.get_db())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(copy_row.count, 2);
        assert_eq!(copy_row.unique_count, 1);
        assert_eq!(copy_row.promo_id, 1);
    }

    #[tokio::test]
    async fn test_rerun_without_new_events_is_noop() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        insert_event(&storage, "copy", Some(1), now - Duration::minutes(5), true).await;

        let aggregator = HourlyAggregator::with_interval(storage.clone(), 3600);
        aggregator.run(now).await.unwrap();

        let before = daily_aggregate::Entity::find()
            .all(storage.get_db())
            .await
            .unwrap();

        // 同一批事件仍在回看窗口内，重跑不得重复计数
        let report = aggregator.run(now + Duration::minutes(1)).await.unwrap();
        assert_eq!(report.events_scanned, 0);

        let after = daily_aggregate::Entity::find()
            .all(storage.get_db())
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_overlapping_windows_count_new_events_only() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();
        let aggregator = HourlyAggregator::with_interval(storage.clone(), 3600);

        insert_event(&storage, "copy", Some(1), now - Duration::minutes(30), true).await;
        aggregator.run(now).await.unwrap();

        // 第二轮窗口覆盖第一轮的事件，但游标保证只折叠新事件
        insert_event(&storage, "copy", Some(1), now + Duration::minutes(10), false).await;
        let report = aggregator.run(now + Duration::hours(1)).await.unwrap();
        assert_eq!(report.events_scanned, 1);

        // 跨午夜时会落在两行，按类型求和后校验
        let rows = daily_aggregate::Entity::find()
            .filter(daily_aggregate::Column::EventType.eq("copy"))
            .all(storage.get_db())
            .await
            .unwrap();
        let total: i64 = rows.iter().map(|r| r.count).sum();
        let unique: i64 = rows.iter().map(|r| r.unique_count).sum();
        assert_eq!(total, 2);
        assert_eq!(unique, 1);
    }

    #[tokio::test]
    async fn test_fold_commits_aggregates_and_cursor_together() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        insert_event(&storage, "copy", Some(1), now - Duration::minutes(5), true).await;

        let aggregator = HourlyAggregator::with_interval(storage.clone(), 3600);
        let report = aggregator.run(now).await.unwrap();

        // 汇总和游标同事务提交：二者必须同时可见且一致
        let cursor_row = job_cursor::Entity::find()
            .one(storage.get_db())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cursor_row.last_event_id, report.cursor);

        let aggregates = daily_aggregate::Entity::find()
            .all(storage.get_db())
            .await
            .unwrap();
        assert_eq!(aggregates.len(), 1);
    }

    #[tokio::test]
    async fn test_rolled_back_fold_leaves_no_aggregates() {
        use promotrack::analytics::{AggregateKey, AggregateRow, DailyAggregateWriter, EventType};
        use sea_orm::TransactionTrait;

        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        let rows = vec![AggregateRow {
            date: now.date_naive(),
            key: AggregateKey::new(EventType::Copy, Some(1), None, None),
            count: 2,
            unique_count: 1,
        }];

        // 模拟折叠事务后半段失败（如游标写入）：
        // 已执行的汇总累加必须随回滚消失，不能留下半次提交
        let txn = storage.get_db().begin().await.unwrap();
        DailyAggregateWriter::new(&txn)
            .upsert_rows(&rows, "test")
            .await
            .unwrap();
        txn.rollback().await.unwrap();

        let committed = daily_aggregate::Entity::find()
            .all(storage.get_db())
            .await
            .unwrap();
        assert!(committed.is_empty());

        let cursor = job_cursor::Entity::find()
            .one(storage.get_db())
            .await
            .unwrap();
        assert!(cursor.is_none());
    }

    #[tokio::test]
    async fn test_backfill_uses_wider_window() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        // 常规 2 小时窗口之外、3 天窗口之内
        insert_event(&storage, "open", Some(2), now - Duration::hours(40), true).await;

        let aggregator = HourlyAggregator::with_interval(storage.clone(), 3600);
        let regular = aggregator.run(now).await.unwrap();
        assert_eq!(regular.events_scanned, 0);

        let backfill = aggregator.run_backfill(now, 3).await.unwrap();
        assert_eq!(backfill.events_scanned, 1);
    }
}

// =============================================================================
// 保留期清理测试
// =============================================================================

mod retention_tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_deletes_strictly_older_than_cutoff() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        insert_event(&storage, "copy", Some(1), now - Duration::days(31), false).await;
        insert_event(&storage, "copy", Some(1), now - Duration::days(29), false).await;
        insert_event(&storage, "copy", Some(1), now, false).await;

        let cleanup = RetentionCleanup::new(storage.clone());
        let deleted = cleanup.run(now, 30).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = event::Entity::find().all(storage.get_db()).await.unwrap();
        assert_eq!(remaining.len(), 2);

        // 第二次运行无事可做
        let deleted = cleanup.run(now, 30).await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_cleanup_preserves_aggregates() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        insert_event(&storage, "copy", Some(1), now - Duration::days(40), false).await;
        insert_aggregate(
            &storage,
            (now - Duration::days(40)).date_naive(),
            "copy",
            1,
            5,
        )
        .await;

        RetentionCleanup::new(storage.clone())
            .run(now, 30)
            .await
            .unwrap();

        let aggregates = daily_aggregate::Entity::find()
            .all(storage.get_db())
            .await
            .unwrap();
        assert_eq!(aggregates.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_batches_cover_all_rows() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        for _ in 0..7 {
            insert_event(&storage, "copy", Some(1), now - Duration::days(60), false).await;
        }

        // 批大小 2，需要多轮批次才能删完
        let cleanup = RetentionCleanup::with_batch_size(storage.clone(), 2);
        let deleted = cleanup.run(now, 30).await.unwrap();
        assert_eq!(deleted, 7);
    }
}

// =============================================================================
// 自动热门测试
// =============================================================================

mod auto_hot_tests {
    use super::*;

    fn updater(storage: Arc<SeaOrmStorage>) -> AutoHotUpdater {
        AutoHotUpdater::new(storage, 72, 7)
    }

    async fn promo_is_hot(storage: &SeaOrmStorage, id: i64) -> bool {
        promo_code::Entity::find_by_id(id)
            .one(storage.get_db())
            .await
            .unwrap()
            .unwrap()
            .is_hot
    }

    #[tokio::test]
    async fn test_expiring_soon_with_clicks_gets_flagged() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        let id = insert_promo(&storage, "deal", false, true, Some(now + Duration::hours(48))).await;
        insert_aggregate(&storage, now.date_naive(), "copy", id, 3).await;

        let report = updater(storage.clone()).run(now).await.unwrap();
        assert_eq!(report.flagged, 1);
        assert!(promo_is_hot(&storage, id).await);
    }

    #[tokio::test]
    async fn test_expiring_soon_without_clicks_not_flagged() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        let id = insert_promo(&storage, "deal", false, true, Some(now + Duration::hours(48))).await;

        updater(storage.clone()).run(now).await.unwrap();
        assert!(!promo_is_hot(&storage, id).await);
    }

    #[tokio::test]
    async fn test_views_do_not_count_as_usage() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        let id = insert_promo(&storage, "deal", false, true, Some(now + Duration::hours(48))).await;
        insert_aggregate(&storage, now.date_naive(), "view", id, 100).await;

        updater(storage.clone()).run(now).await.unwrap();
        assert!(!promo_is_hot(&storage, id).await);
    }

    #[tokio::test]
    async fn test_expiring_beyond_horizon_never_flagged() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        let id =
            insert_promo(&storage, "deal", false, true, Some(now + Duration::hours(100))).await;
        insert_aggregate(&storage, now.date_naive(), "copy", id, 50).await;

        updater(storage.clone()).run(now).await.unwrap();
        assert!(!promo_is_hot(&storage, id).await);
    }

    #[tokio::test]
    async fn test_expired_hot_promo_gets_unflagged() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        let id = insert_promo(&storage, "old", true, true, Some(now - Duration::hours(1))).await;

        let report = updater(storage.clone()).run(now).await.unwrap();
        assert_eq!(report.unflagged, 1);
        assert!(!promo_is_hot(&storage, id).await);
    }

    #[tokio::test]
    async fn test_inactive_hot_promo_gets_unflagged() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        let id = insert_promo(&storage, "off", true, false, Some(now + Duration::hours(48))).await;

        updater(storage.clone()).run(now).await.unwrap();
        assert!(!promo_is_hot(&storage, id).await);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let (storage, _td) = create_temp_storage().await;
        let now = Utc::now();

        let id = insert_promo(&storage, "deal", false, true, Some(now + Duration::hours(48))).await;
        insert_aggregate(&storage, now.date_naive(), "copy", id, 3).await;

        let sweeper = updater(storage.clone());
        let first = sweeper.run(now).await.unwrap();
        assert_eq!(first.flagged, 1);

        // 已经热门，第二轮不再变更
        let second = sweeper.run(now).await.unwrap();
        assert_eq!(second.flagged, 0);
        assert_eq!(second.unflagged, 0);
        assert!(promo_is_hot(&storage, id).await);
    }
}
