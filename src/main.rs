use std::sync::Arc;

use promotrack::cli;
use promotrack::config::AppConfig;
use promotrack::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::load());

    // guard 持有到进程结束，保证缓冲日志落盘
    let _log_guard = init_logging(&config.logging);

    cli::run(config).await
}
