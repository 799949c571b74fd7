//! HTTP 服务器启动
//!
//! 组装存储、去重缓存、采集服务和后台任务循环，
//! 然后启动 actix-web 服务器。公共 API 无认证，
//! 采集端点带每 IP 限流。

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Compress, web};
use anyhow::Result;
use tracing::{info, warn};

use crate::analytics::IngestService;
use crate::analytics::scheduler::start_background_jobs;
use crate::api::services::{health, listing, stats, track};
use crate::cache::build_dedup_cache;
use crate::config::AppConfig;
use crate::storage::backend::SeaOrmStorage;

/// 启动 HTTP 服务器（含后台任务）
///
/// 日志系统必须在调用前初始化。
pub async fn run_server(config: Arc<AppConfig>) -> Result<()> {
    let storage = Arc::new(SeaOrmStorage::new(&config.database).await?);
    let cache = build_dedup_cache(&config.cache).await;

    let ingest = Arc::new(IngestService::new(
        storage.clone(),
        cache.clone(),
        config.clone(),
    ));

    let job_handles = start_background_jobs(storage.clone(), cache.clone(), config.clone());

    let governor_conf = track::track_rate_limiter_config(&config);
    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    info!(
        "Track rate limit: {} req/min per IP",
        config.analytics.rate_limit_per_minute
    );
    warn!("Starting server at http://{}", bind_address);

    let app_config = config.clone();
    let server = HttpServer::new(move || {
        // 公共目录 API，允许任意来源的跨域读取和采集
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["Content-Type"])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Compress::default())
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(ingest.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::PayloadConfig::new(256 * 1024))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::resource("/track")
                            .wrap(track::track_rate_limiter(&governor_conf))
                            .route(web::post().to(track::track_events)),
                    )
                    .route("/promos", web::get().to(listing::list_promos))
                    .route(
                        "/stats/top-promos",
                        web::get().to(stats::top_promos_handler),
                    )
                    .route(
                        "/stats/top-stores",
                        web::get().to(stats::top_stores_handler),
                    ),
            )
            .route("/healthz", web::get().to(health::healthz))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .bind(&bind_address)?
    .run();

    let result = server.await;

    for handle in job_handles {
        handle.abort();
    }

    result?;
    Ok(())
}
