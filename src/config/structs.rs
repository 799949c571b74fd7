use serde::{Deserialize, Serialize};

/// 应用配置（从 TOML 加载，启动时传入各组件）
///
/// 进程启动时加载一次，之后以 `Arc<AppConfig>` 显式传递，
/// 组件不做任何运行时全局查找。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

impl AppConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：PT，分隔符：__
    /// 示例：PT__SERVER__PORT=9999
    pub fn load() -> Self {
        use config::{Config, Environment, File};

        let path = "config.toml";

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("PT")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<AppConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 可信反向代理列表（IP 或 CIDR）。来自可信代理的连接
    /// 才会采信 X-Forwarded-For。
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            trusted_proxies: Vec::new(),
        }
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_database_url() -> String {
    "sqlite://promotrack.db?mode=rwc".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

/// 去重缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 缓存后端："redis"、"memory" 或 "null"
    #[serde(default = "default_cache_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_key_prefix() -> String {
    "promotrack:".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "plain" 或 "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    /// 日志文件路径，空表示输出到控制台
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_true")]
    pub enable_rotation: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "plain".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_backups() -> u32 {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: default_true(),
            max_backups: default_max_backups(),
        }
    }
}

/// 分析管线业务参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// 去重窗口（秒），同一 (类型, 目标, 会话) 在窗口内只计一次 unique
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
    /// 每 IP 每分钟的采集请求预算
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    /// 单次采集请求允许的最大事件数
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// 原始事件保留天数
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// 自动热门：到期时间在该小时数内的促销码才是候选
    #[serde(default = "default_hot_horizon_hours")]
    pub hot_horizon_hours: i64,
    /// 排序与自动热门统计所用的滚动窗口（天）
    #[serde(default = "default_usage_window_days")]
    pub usage_window_days: i64,
}

fn default_dedup_ttl_secs() -> u64 {
    1800
}

fn default_rate_limit_per_minute() -> u32 {
    60
}

fn default_max_batch_size() -> usize {
    100
}

fn default_retention_days() -> u64 {
    30
}

fn default_hot_horizon_hours() -> i64 {
    72
}

fn default_usage_window_days() -> i64 {
    7
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            dedup_ttl_secs: default_dedup_ttl_secs(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            max_batch_size: default_max_batch_size(),
            retention_days: default_retention_days(),
            hot_horizon_hours: default_hot_horizon_hours(),
            usage_window_days: default_usage_window_days(),
        }
    }
}

/// 后台任务调度配置
///
/// 业务逻辑不感知触发方式，这里只描述各任务的节奏和时间预算。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// 聚合任务周期（秒），回看窗口为其 2 倍
    #[serde(default = "default_aggregate_interval_secs")]
    pub aggregate_interval_secs: u64,
    /// 清理任务周期（秒）
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// 自动热门任务周期（秒）
    #[serde(default = "default_auto_hot_interval_secs")]
    pub auto_hot_interval_secs: u64,
    /// 去重缓存压缩周期（秒），尽力而为
    #[serde(default = "default_dedup_compact_interval_secs")]
    pub dedup_compact_interval_secs: u64,
    /// 单次任务软预算（秒），超出记 warn
    #[serde(default = "default_soft_budget_secs")]
    pub soft_budget_secs: u64,
    /// 单次任务硬预算（秒），超出强制终止本次运行
    #[serde(default = "default_hard_budget_secs")]
    pub hard_budget_secs: u64,
}

fn default_aggregate_interval_secs() -> u64 {
    3600
}

fn default_cleanup_interval_secs() -> u64 {
    86400
}

fn default_auto_hot_interval_secs() -> u64 {
    3600
}

fn default_dedup_compact_interval_secs() -> u64 {
    21600
}

fn default_soft_budget_secs() -> u64 {
    180
}

fn default_hard_budget_secs() -> u64 {
    600
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            aggregate_interval_secs: default_aggregate_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            auto_hot_interval_secs: default_auto_hot_interval_secs(),
            dedup_compact_interval_secs: default_dedup_compact_interval_secs(),
            soft_budget_secs: default_soft_budget_secs(),
            hard_budget_secs: default_hard_budget_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.analytics.dedup_ttl_secs, 1800);
        assert_eq!(config.analytics.retention_days, 30);
        assert_eq!(config.analytics.hot_horizon_hours, 72);
        assert_eq!(config.jobs.aggregate_interval_secs, 3600);
    }

    #[test]
    fn test_sample_config_roundtrip() {
        let sample = AppConfig::generate_sample_config();
        let parsed: AppConfig = toml::from_str(&sample).expect("sample config must parse");
        assert_eq!(parsed.server.port, AppConfig::default().server.port);
    }
}
