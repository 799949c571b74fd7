//! 事件采集端点
//!
//! `POST /api/v1/track`：批量接收事件，成功返回 204。
//! 每 IP 限流；限流 key 默认取连接 IP（无法伪造），
//! 连接来自可信代理时才采信 X-Forwarded-For。

use std::sync::Arc;

use actix_governor::{Governor, GovernorConfig, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use governor::middleware::NoOpMiddleware;
use tracing::{debug, error};

use crate::analytics::{IngestService, TrackPayload};
use crate::config::AppConfig;
use crate::errors::PromoTrackError;
use crate::utils::ip::is_trusted_proxy;

use super::error_response;

/// 基于 IP 地址的限流 key 提取器
#[derive(Clone)]
pub struct TrackKeyExtractor {
    trusted_proxies: Arc<Vec<String>>,
}

impl TrackKeyExtractor {
    pub fn new(trusted_proxies: Vec<String>) -> Self {
        Self {
            trusted_proxies: Arc::new(trusted_proxies),
        }
    }
}

impl KeyExtractor for TrackKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let conn_info = req.connection_info();

        let peer_ip = conn_info
            .peer_addr()
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract peer IP"))?;

        if !self.trusted_proxies.is_empty() && is_trusted_proxy(peer_ip, &self.trusted_proxies) {
            let real_ip = conn_info.realip_remote_addr().unwrap_or(peer_ip);
            debug!("Track rate limit key from trusted proxy: {}", real_ip);
            Ok(real_ip.to_string())
        } else {
            Ok(peer_ip.to_string())
        }
    }
}

/// 令牌补充间隔：一分钟预算均摊到毫秒粒度
///
/// 毫秒粒度才能表达高于 60/min 的预算，秒粒度会把
/// 补充速率截断到每秒一个。下限 1ms。
fn replenish_interval_ms(per_minute: u32) -> u64 {
    (60_000 / per_minute.max(1) as u64).max(1)
}

/// 构建采集限流配置
///
/// 预算按分钟折算成令牌补充速率，突发额度即整分钟预算。
/// 超限返回 HTTP 429 Too Many Requests。
pub fn track_rate_limiter_config(
    config: &AppConfig,
) -> GovernorConfig<TrackKeyExtractor, NoOpMiddleware> {
    let per_minute = config.analytics.rate_limit_per_minute.max(1);

    GovernorConfigBuilder::default()
        .milliseconds_per_request(replenish_interval_ms(per_minute))
        .burst_size(per_minute)
        .key_extractor(TrackKeyExtractor::new(
            config.server.trusted_proxies.clone(),
        ))
        .finish()
        .expect("Invalid rate limit config")
}

/// 按配置构建限流中间件
pub fn track_rate_limiter(
    config: &GovernorConfig<TrackKeyExtractor, NoOpMiddleware>,
) -> Governor<TrackKeyExtractor, NoOpMiddleware> {
    Governor::new(config)
}

/// `POST /api/v1/track`
///
/// 请求体 JSON 解析失败由 actix 直接拒为 400；
/// 空批次/超大批次 400；存储失败 500（客户端可整批重试）。
pub async fn track_events(
    req: HttpRequest,
    payload: web::Json<TrackPayload>,
    ingest: web::Data<Arc<IngestService>>,
    config: web::Data<Arc<AppConfig>>,
) -> ActixResult<HttpResponse> {
    let client_ip = crate::utils::ip::extract_client_ip(&req, &config.server.trusted_proxies);
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    match ingest
        .ingest(payload.into_inner(), &client_ip, &user_agent)
        .await
    {
        Ok(_) => Ok(HttpResponse::NoContent().finish()),
        Err(err @ PromoTrackError::Validation(_)) => {
            Ok(error_response(StatusCode::BAD_REQUEST, &err))
        }
        Err(err) => {
            error!("Track request failed: {}", err);
            Ok(error_response(StatusCode::INTERNAL_SERVER_ERROR, &err))
        }
    }
}
