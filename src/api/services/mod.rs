//! API 端点实现

pub mod health;
pub mod listing;
pub mod stats;
pub mod track;

use actix_web::HttpResponse;
use serde_json::json;

use crate::errors::PromoTrackError;

/// 统一的错误响应体
pub fn error_response(status: actix_web::http::StatusCode, err: &PromoTrackError) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "code": err.code(),
        "error": err.error_type(),
        "message": err.message(),
    }))
}
