//! 统计端点
//!
//! 排行读 daily_aggregates，查询失败返回空结果集而非 5xx：
//! 统计是装饰性数据，不值得让页面渲染失败。

use std::sync::Arc;

use actix_web::{HttpResponse, Result as ActixResult, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::analytics::usage;
use crate::storage::backend::SeaOrmStorage;

const TOP_LIMIT: u64 = 10;
const DEFAULT_RANGE_DAYS: i64 = 7;
const MAX_RANGE_DAYS: i64 = 90;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub range: Option<String>,
}

#[derive(Debug, Serialize)]
struct TopEntry {
    id: i64,
    count: i64,
}

/// 解析 "{N}d" 形式的窗口参数，非法值回退默认
fn parse_range_days(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return DEFAULT_RANGE_DAYS;
    };

    raw.strip_suffix('d')
        .and_then(|n| n.parse::<i64>().ok())
        .filter(|n| (1..=MAX_RANGE_DAYS).contains(n))
        .unwrap_or(DEFAULT_RANGE_DAYS)
}

fn stats_response(range_days: i64, rows: Vec<(i64, i64)>) -> HttpResponse {
    let results: Vec<TopEntry> = rows
        .into_iter()
        .map(|(id, count)| TopEntry { id, count })
        .collect();

    HttpResponse::Ok().json(json!({
        "range_days": range_days,
        "results": results,
    }))
}

/// `GET /api/v1/stats/top-promos?range=7d`
pub async fn top_promos_handler(
    query: web::Query<StatsQuery>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> ActixResult<HttpResponse> {
    let range_days = parse_range_days(query.range.as_deref());

    let rows = match usage::top_promos(storage.get_db(), Utc::now(), range_days, TOP_LIMIT).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Top promos query failed, returning empty set: {}", e);
            Vec::new()
        }
    };

    Ok(stats_response(range_days, rows))
}

/// `GET /api/v1/stats/top-stores?range=7d`
pub async fn top_stores_handler(
    query: web::Query<StatsQuery>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> ActixResult<HttpResponse> {
    let range_days = parse_range_days(query.range.as_deref());

    let rows = match usage::top_stores(storage.get_db(), Utc::now(), range_days, TOP_LIMIT).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Top stores query failed, returning empty set: {}", e);
            Vec::new()
        }
    };

    Ok(stats_response(range_days, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_days() {
        assert_eq!(parse_range_days(None), 7);
        assert_eq!(parse_range_days(Some("7d")), 7);
        assert_eq!(parse_range_days(Some("30d")), 30);
        // 非法/越界值回退默认
        assert_eq!(parse_range_days(Some("0d")), 7);
        assert_eq!(parse_range_days(Some("365d")), 7);
        assert_eq!(parse_range_days(Some("week")), 7);
        assert_eq!(parse_range_days(Some("")), 7);
    }
}
