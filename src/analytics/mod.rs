//! 行为分析管线
//!
//! 事件采集（含去重标记）→ 天级聚合 → 排序/统计读取，
//! 外加保留期清理和自动热门两个维护任务。
//! 各任务只暴露 `run(now)`，触发节奏由 [`scheduler`] 统一负责。

pub mod aggregate_writer;
pub mod aggregator;
pub mod auto_hot;
pub mod ingest;
pub mod ranking;
pub mod retention;
pub mod scheduler;
pub mod usage;

use strum::{Display, EnumIter, EnumString};

pub use aggregate_writer::{AggregateRow, DailyAggregateWriter};
pub use aggregator::{AggregateReport, HourlyAggregator};
pub use auto_hot::{AutoHotReport, AutoHotUpdater};
pub use ingest::{EventDraft, IngestReport, IngestService, TrackPayload};
pub use ranking::{default_order, rank_promos};
pub use retention::RetentionCleanup;

/// 事件类型词表
///
/// 序列化形式即数据库中 `event_type` 列的取值。
/// 历史客户端会上报若干旧别名，解析时统一折叠到规范值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum EventType {
    #[strum(to_string = "view")]
    View,
    #[strum(to_string = "copy", serialize = "promo_copy", serialize = "copy_code")]
    Copy,
    #[strum(to_string = "open", serialize = "promo_open", serialize = "click")]
    Open,
    #[strum(to_string = "finance_open")]
    FinanceOpen,
    #[strum(to_string = "deal_open")]
    DealOpen,
    #[strum(to_string = "showcase_view")]
    ShowcaseView,
    #[strum(to_string = "showcase_open")]
    ShowcaseOpen,
}

impl EventType {
    /// 解析事件类型（含旧别名），未知值返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    /// 是否为"使用"信号（复制 / 打开类交互）
    ///
    /// 浏览和橱窗曝光不算使用，不进入排序权重和自动热门判定。
    pub fn is_click_like(&self) -> bool {
        matches!(
            self,
            EventType::Copy | EventType::Open | EventType::FinanceOpen | EventType::DealOpen
        )
    }
}

/// 使用信号对应的事件类型列表（查询过滤用）
pub const CLICK_EVENT_TYPES: [EventType; 4] = [
    EventType::Copy,
    EventType::Open,
    EventType::FinanceOpen,
    EventType::DealOpen,
];

/// 使用信号的数据库字符串形式
pub fn click_event_type_strings() -> Vec<String> {
    CLICK_EVENT_TYPES.iter().map(|t| t.to_string()).collect()
}

/// 聚合分组标识
///
/// 目标列用 0 表示"无引用"，与存储层的唯一索引语义一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub event_type: EventType,
    pub promo_id: i64,
    pub store_id: i64,
    pub showcase_id: i64,
}

impl AggregateKey {
    pub fn new(
        event_type: EventType,
        promo_id: Option<i64>,
        store_id: Option<i64>,
        showcase_id: Option<i64>,
    ) -> Self {
        Self {
            event_type,
            promo_id: promo_id.unwrap_or(0),
            store_id: store_id.unwrap_or(0),
            showcase_id: showcase_id.unwrap_or(0),
        }
    }
}

/// 构造去重键
///
/// 目标取 promo / store / showcase 中第一个非空 id；
/// 同一 (类型, 目标, 会话) 在 TTL 窗口内只计一次 unique。
pub fn dedup_key(
    event_type: EventType,
    promo_id: Option<i64>,
    store_id: Option<i64>,
    showcase_id: Option<i64>,
    session_id: &str,
) -> String {
    let target = promo_id.or(store_id).or(showcase_id).unwrap_or(0);
    format!("click:{}:{}:{}", event_type, target, session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_canonical_parse() {
        assert_eq!(EventType::parse("view"), Some(EventType::View));
        assert_eq!(EventType::parse("copy"), Some(EventType::Copy));
        assert_eq!(EventType::parse("finance_open"), Some(EventType::FinanceOpen));
        assert_eq!(EventType::parse("showcase_open"), Some(EventType::ShowcaseOpen));
        assert_eq!(EventType::parse("purchase"), None);
        assert_eq!(EventType::parse(""), None);
    }

    #[test]
    fn test_legacy_aliases_fold_to_canonical() {
        assert_eq!(EventType::parse("promo_copy"), Some(EventType::Copy));
        assert_eq!(EventType::parse("copy_code"), Some(EventType::Copy));
        assert_eq!(EventType::parse("promo_open"), Some(EventType::Open));
        assert_eq!(EventType::parse("click"), Some(EventType::Open));
    }

    #[test]
    fn test_display_is_canonical_form() {
        assert_eq!(EventType::Copy.to_string(), "copy");
        assert_eq!(EventType::FinanceOpen.to_string(), "finance_open");
    }

    #[test]
    fn test_click_like_classification() {
        assert!(EventType::Copy.is_click_like());
        assert!(EventType::Open.is_click_like());
        assert!(EventType::FinanceOpen.is_click_like());
        assert!(EventType::DealOpen.is_click_like());
        assert!(!EventType::View.is_click_like());
        assert!(!EventType::ShowcaseView.is_click_like());
        assert!(!EventType::ShowcaseOpen.is_click_like());
    }

    #[test]
    fn test_dedup_key_uses_first_target() {
        let key = dedup_key(EventType::Copy, Some(42), None, None, "sess-1");
        assert_eq!(key, "click:copy:42:sess-1");

        // promo 为空时回退到 store
        let key = dedup_key(EventType::Open, None, Some(7), Some(9), "sess-1");
        assert_eq!(key, "click:open:7:sess-1");

        // 全空回退到 0
        let key = dedup_key(EventType::View, None, None, None, "sess-1");
        assert_eq!(key, "click:view:0:sess-1");
    }

    #[test]
    fn test_aggregate_key_zero_sentinel() {
        let key = AggregateKey::new(EventType::Copy, Some(5), None, None);
        assert_eq!(key.promo_id, 5);
        assert_eq!(key.store_id, 0);
        assert_eq!(key.showcase_id, 0);
    }
}
