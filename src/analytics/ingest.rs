//! 事件采集服务
//!
//! 接收批量事件描述，逐条校验（坏的跳过、好的保留），
//! 对带会话的事件做 set-if-absent 去重标记，最后一次性批量入库。
//! 缓存故障只影响 unique 标记，绝不让采集请求失败。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveValue::Set, EntityTrait};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::analytics::{EventType, dedup_key};
use crate::cache::DedupCache;
use crate::config::AppConfig;
use crate::errors::{PromoTrackError, Result};
use crate::storage::backend::SeaOrmStorage;
use crate::storage::backend::retry;
use migration::entities::event;

/// 采集请求体
#[derive(Debug, Deserialize)]
pub struct TrackPayload {
    pub events: Vec<EventDraft>,
}

/// 单条事件描述（客户端视角）
///
/// 客户端只描述交互本身；IP 和 User-Agent 由服务端观测，
/// 请求体里出现的同名字段一律忽略。
#[derive(Debug, Deserialize)]
pub struct EventDraft {
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub promo_id: Option<i64>,
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default)]
    pub showcase_id: Option<i64>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, rename = "ref")]
    pub referrer: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
}

/// 采集结果
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// 实际入库的事件数
    pub stored: usize,
    /// 因类型未知/缺失被跳过的描述数
    pub skipped: usize,
    /// 入库事件中标记为 unique 的数量
    pub unique: usize,
}

/// 事件采集服务
pub struct IngestService {
    storage: Arc<SeaOrmStorage>,
    cache: Arc<dyn DedupCache>,
    config: Arc<AppConfig>,
}

impl IngestService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        cache: Arc<dyn DedupCache>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            storage,
            cache,
            config,
        }
    }

    /// 采集一批事件
    ///
    /// 空批次和超大批次按校验错误拒绝；类型未知的描述跳过、
    /// 其余照常处理；入库是单条批量插入，失败则整批失败。
    pub async fn ingest(
        &self,
        payload: TrackPayload,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<IngestReport> {
        if payload.events.is_empty() {
            return Err(PromoTrackError::validation("events must not be empty"));
        }

        let max_batch = self.config.analytics.max_batch_size;
        if payload.events.len() > max_batch {
            return Err(PromoTrackError::validation(format!(
                "batch size {} exceeds limit {}",
                payload.events.len(),
                max_batch
            )));
        }

        let now = Utc::now();
        let ttl = Duration::from_secs(self.config.analytics.dedup_ttl_secs);

        let mut report = IngestReport::default();
        let mut models: Vec<event::ActiveModel> = Vec::with_capacity(payload.events.len());

        for draft in &payload.events {
            let Some(event_type) = draft
                .event_type
                .as_deref()
                .and_then(EventType::parse)
            else {
                debug!(
                    "Skipping event with unknown type: {:?}",
                    draft.event_type.as_deref().unwrap_or("<missing>")
                );
                report.skipped += 1;
                continue;
            };

            let session_id = draft
                .session_id
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_string();

            // 匿名会话无法去重，直接按非 unique 处理。
            // 键的命名空间前缀由缓存实现自行管理。
            let is_unique = if session_id.is_empty() {
                false
            } else {
                let key = dedup_key(
                    event_type,
                    draft.promo_id,
                    draft.store_id,
                    draft.showcase_id,
                    &session_id,
                );
                self.cache.set_if_absent(&key, ttl).await
            };

            if is_unique {
                report.unique += 1;
            }

            models.push(event::ActiveModel {
                created_at: Set(now),
                event_type: Set(event_type.to_string()),
                promo_id: Set(draft.promo_id),
                store_id: Set(draft.store_id),
                showcase_id: Set(draft.showcase_id),
                session_id: Set(clip(&session_id, 64)),
                client_ip: Set(clip(client_ip, 45)),
                user_agent: Set(user_agent.to_string()),
                referrer: Set(draft.referrer.clone().unwrap_or_default()),
                utm_source: Set(clip(draft.utm_source.as_deref().unwrap_or(""), 100)),
                utm_medium: Set(clip(draft.utm_medium.as_deref().unwrap_or(""), 100)),
                utm_campaign: Set(clip(draft.utm_campaign.as_deref().unwrap_or(""), 100)),
                is_unique: Set(is_unique),
                ..Default::default()
            });
        }

        if models.is_empty() {
            debug!("Track batch contained no valid events ({} skipped)", report.skipped);
            return Ok(report);
        }

        report.stored = models.len();

        let db = self.storage.get_db();
        let retry_config = self.storage.retry_config();
        retry::with_retry("ingest_insert_events", retry_config, || {
            let batch = models.clone();
            async move {
                event::Entity::insert_many(batch).exec(db).await?;
                Ok(())
            }
        })
        .await
        .map_err(|e| {
            warn!("Event batch insert failed: {}", e);
            PromoTrackError::from(e)
        })?;

        debug!(
            "Ingested {} events ({} unique, {} skipped) from {}",
            report.stored, report.unique, report.skipped, client_ip
        );

        Ok(report)
    }
}

/// 按字符边界截断超长输入
fn clip(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        value.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdef", 3), "abc");
        // 多字节字符不被截成半个
        assert_eq!(clip("数据分析管线", 2), "数据");
    }

    #[test]
    fn test_draft_deserializes_ref_alias() {
        let draft: EventDraft = serde_json::from_str(
            r#"{"event_type":"copy","promo_id":1,"ref":"https://example.com"}"#,
        )
        .unwrap();
        assert_eq!(draft.referrer.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_payload_requires_events_field() {
        let result: std::result::Result<TrackPayload, _> = serde_json::from_str(r#"{}"#);
        assert!(result.is_err());
    }
}
