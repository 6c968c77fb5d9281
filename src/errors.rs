use std::fmt;

#[derive(Debug, Clone)]
pub enum HoplinkError {
    CacheConnection(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Serialization(String),
    TokenOperation(String),
}

impl HoplinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            HoplinkError::CacheConnection(_) => "E001",
            HoplinkError::DatabaseConfig(_) => "E002",
            HoplinkError::DatabaseConnection(_) => "E003",
            HoplinkError::DatabaseOperation(_) => "E004",
            HoplinkError::Validation(_) => "E005",
            HoplinkError::NotFound(_) => "E006",
            HoplinkError::Conflict(_) => "E007",
            HoplinkError::Serialization(_) => "E008",
            HoplinkError::TokenOperation(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            HoplinkError::CacheConnection(_) => "Cache Connection Error",
            HoplinkError::DatabaseConfig(_) => "Database Configuration Error",
            HoplinkError::DatabaseConnection(_) => "Database Connection Error",
            HoplinkError::DatabaseOperation(_) => "Database Operation Error",
            HoplinkError::Validation(_) => "Validation Error",
            HoplinkError::NotFound(_) => "Resource Not Found",
            HoplinkError::Conflict(_) => "Resource Conflict",
            HoplinkError::Serialization(_) => "Serialization Error",
            HoplinkError::TokenOperation(_) => "Token Operation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            HoplinkError::CacheConnection(msg)
            | HoplinkError::DatabaseConfig(msg)
            | HoplinkError::DatabaseConnection(msg)
            | HoplinkError::DatabaseOperation(msg)
            | HoplinkError::Validation(msg)
            | HoplinkError::NotFound(msg)
            | HoplinkError::Conflict(msg)
            | HoplinkError::Serialization(msg)
            | HoplinkError::TokenOperation(msg) => msg,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for HoplinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for HoplinkError {}

// 便捷的构造函数
impl HoplinkError {
    pub fn cache_connection<T: Into<String>>(msg: T) -> Self {
        HoplinkError::CacheConnection(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        HoplinkError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        HoplinkError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        HoplinkError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        HoplinkError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        HoplinkError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        HoplinkError::Conflict(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        HoplinkError::Serialization(msg.into())
    }

    pub fn token_operation<T: Into<String>>(msg: T) -> Self {
        HoplinkError::TokenOperation(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for HoplinkError {
    fn from(err: sea_orm::DbErr) -> Self {
        HoplinkError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for HoplinkError {
    fn from(err: serde_json::Error) -> Self {
        HoplinkError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for HoplinkError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        HoplinkError::TokenOperation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HoplinkError>;
