mod connection;
pub mod retry;

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{PromoTrackError, Result};
use retry::RetryConfig;

pub use connection::{connect_generic, connect_sqlite, run_migrations};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(PromoTrackError::database_config(format!(
            "Cannot infer database backend from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: RetryConfig,
}

impl SeaOrmStorage {
    /// 建立连接、跑迁移并返回存储句柄
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let backend_name = infer_backend_from_url(&config.url)?;

        let db = match backend_name.as_str() {
            "sqlite" => connect_sqlite(&config.url).await?,
            other => connect_generic(&config.url, other, config.pool_size).await?,
        };

        run_migrations(&db).await?;

        info!("Storage initialized (backend: {})", backend_name);

        Ok(Self {
            db,
            backend_name,
            retry_config: RetryConfig {
                max_retries: config.retry_count,
                base_delay_ms: config.retry_base_delay_ms,
                max_delay_ms: config.retry_max_delay_ms,
            },
        })
    }

    /// 包装既有连接（测试用）
    pub fn from_connection(db: DatabaseConnection, backend_name: &str) -> Self {
        Self {
            db,
            backend_name: backend_name.to_string(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry_config
    }
}
