//! 促销码列表端点
//!
//! `GET /api/v1/promos`：过滤 + 排序 + 分页。
//! `ordering=popular` 走热度排序；未知 ordering 或聚合读取失败
//! 一律回退默认排序，列表请求从不因统计层故障而失败。

use std::sync::Arc;

use actix_web::{HttpResponse, Result as ActixResult, web};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::analytics::usage::promo_usage_totals;
use crate::analytics::{default_order, rank_promos};
use crate::config::AppConfig;
use crate::storage::backend::SeaOrmStorage;
use migration::entities::promo_code;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub store: Option<i64>,
    #[serde(default)]
    pub is_hot: Option<bool>,
    #[serde(default)]
    pub is_recommended: Option<bool>,
    /// 默认只展示上架且未过期的促销码
    #[serde(default)]
    pub active_only: Option<bool>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
    #[serde(default)]
    pub ordering: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PromoSummary {
    pub id: i64,
    pub title: String,
    pub code: String,
    pub store_id: Option<i64>,
    pub is_hot: bool,
    pub is_recommended: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<promo_code::Model> for PromoSummary {
    fn from(m: promo_code::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            code: m.code,
            store_id: m.store_id,
            is_hot: m.is_hot,
            is_recommended: m.is_recommended,
            expires_at: m.expires_at,
            created_at: m.created_at,
        }
    }
}

/// `GET /api/v1/promos`
pub async fn list_promos(
    query: web::Query<ListQuery>,
    storage: web::Data<Arc<SeaOrmStorage>>,
    config: web::Data<Arc<AppConfig>>,
) -> ActixResult<HttpResponse> {
    let db = storage.get_db();
    let now = Utc::now();

    let mut select = promo_code::Entity::find();

    if let Some(store_id) = query.store {
        select = select.filter(promo_code::Column::StoreId.eq(store_id));
    }
    if let Some(is_hot) = query.is_hot {
        select = select.filter(promo_code::Column::IsHot.eq(is_hot));
    }
    if let Some(is_recommended) = query.is_recommended {
        select = select.filter(promo_code::Column::IsRecommended.eq(is_recommended));
    }
    if query.active_only.unwrap_or(true) {
        select = select.filter(promo_code::Column::IsActive.eq(true)).filter(
            Condition::any()
                .add(promo_code::Column::ExpiresAt.is_null())
                .add(promo_code::Column::ExpiresAt.gt(now)),
        );
    }

    let promos = match select.all(db).await {
        Ok(promos) => promos,
        Err(e) => {
            error!("Promo listing query failed: {}", e);
            return Ok(HttpResponse::InternalServerError().json(json!({
                "error": "listing unavailable"
            })));
        }
    };

    let ordered = match query.ordering.as_deref() {
        Some("popular") => {
            // 聚合读取失败回退默认排序，不影响列表可用性
            match promo_usage_totals(db, now, config.analytics.usage_window_days).await {
                Ok(usage) => rank_promos(promos, &usage),
                Err(e) => {
                    warn!("Usage lookup failed, falling back to default order: {}", e);
                    default_order(promos)
                }
            }
        }
        _ => default_order(promos),
    };

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let total = ordered.len();
    let offset = ((page - 1) * page_size) as usize;
    let results: Vec<PromoSummary> = ordered
        .into_iter()
        .skip(offset)
        .take(page_size as usize)
        .map(PromoSummary::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "count": total,
        "page": page,
        "page_size": page_size,
        "results": results,
    })))
}
