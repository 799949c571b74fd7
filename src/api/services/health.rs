//! 健康检查端点

use std::sync::Arc;

use actix_web::{HttpResponse, Result as ActixResult, web};
use sea_orm::{ConnectionTrait, Statement};
use serde_json::json;
use tracing::warn;

use crate::storage::backend::SeaOrmStorage;

/// `GET /healthz`
///
/// 数据库可达返回 200，否则 503。
pub async fn healthz(storage: web::Data<Arc<SeaOrmStorage>>) -> ActixResult<HttpResponse> {
    let db = storage.get_db();
    let ping = db
        .execute_raw(Statement::from_string(
            db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await;

    match ping {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "backend": storage.backend_name(),
        }))),
        Err(e) => {
            warn!("Health check database ping failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "degraded",
                "version": env!("CARGO_PKG_VERSION"),
            })))
        }
    }
}
