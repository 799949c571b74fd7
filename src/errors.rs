use std::fmt;

#[derive(Debug, Clone)]
pub enum PromoTrackError {
    CacheConnection(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    DateParse(String),
}

impl PromoTrackError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            PromoTrackError::CacheConnection(_) => "E001",
            PromoTrackError::DatabaseConfig(_) => "E002",
            PromoTrackError::DatabaseConnection(_) => "E003",
            PromoTrackError::DatabaseOperation(_) => "E004",
            PromoTrackError::Validation(_) => "E005",
            PromoTrackError::NotFound(_) => "E006",
            PromoTrackError::Serialization(_) => "E007",
            PromoTrackError::DateParse(_) => "E008",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            PromoTrackError::CacheConnection(_) => "Cache Connection Error",
            PromoTrackError::DatabaseConfig(_) => "Database Configuration Error",
            PromoTrackError::DatabaseConnection(_) => "Database Connection Error",
            PromoTrackError::DatabaseOperation(_) => "Database Operation Error",
            PromoTrackError::Validation(_) => "Validation Error",
            PromoTrackError::NotFound(_) => "Resource Not Found",
            PromoTrackError::Serialization(_) => "Serialization Error",
            PromoTrackError::DateParse(_) => "Date Parse Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            PromoTrackError::CacheConnection(msg)
            | PromoTrackError::DatabaseConfig(msg)
            | PromoTrackError::DatabaseConnection(msg)
            | PromoTrackError::DatabaseOperation(msg)
            | PromoTrackError::Validation(msg)
            | PromoTrackError::NotFound(msg)
            | PromoTrackError::Serialization(msg)
            | PromoTrackError::DateParse(msg) => msg,
        }
    }
}

impl fmt::Display for PromoTrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for PromoTrackError {}

// 便捷的构造函数
impl PromoTrackError {
    pub fn cache_connection<T: Into<String>>(msg: T) -> Self {
        PromoTrackError::CacheConnection(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        PromoTrackError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        PromoTrackError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        PromoTrackError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        PromoTrackError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        PromoTrackError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        PromoTrackError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        PromoTrackError::DateParse(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for PromoTrackError {
    fn from(err: sea_orm::DbErr) -> Self {
        PromoTrackError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for PromoTrackError {
    fn from(err: serde_json::Error) -> Self {
        PromoTrackError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for PromoTrackError {
    fn from(err: chrono::ParseError) -> Self {
        PromoTrackError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PromoTrackError>;
