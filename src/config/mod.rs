//! 配置管理
//!
//! 优先级：ENV > config.toml > 默认值
//! ENV 前缀：HOPLINK，分隔符：__
//! 示例：HOPLINK__SERVER__PORT=9999

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Initialize the global configuration
pub fn init_config() {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load()));
}

/// 静态配置（从 TOML + 环境变量加载，启动时固定）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub limits: RateLimitConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub pages: PagesConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    pub fn load() -> Self {
        use config::{Config, Environment, File};

        let path = "config.toml";

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("HOPLINK")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
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
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 可信反向代理（单 IP 或 CIDR）；匹配时信任 X-Forwarded-For
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            trusted_proxies: Vec::new(),
        }
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

/// 缓存系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// "redis" 或 "memory"
    #[serde(rename = "type")]
    #[serde(default = "default_cache_type")]
    pub cache_type: String,
    /// 缓存条目 TTL（秒）
    #[serde(default = "default_cache_ttl")]
    pub default_ttl: u64,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: default_cache_type(),
            default_ttl: default_cache_ttl(),
            redis: RedisConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Redis 配置（缓存、限流计数、访问队列共用一个客户端）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

/// 内存缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_capacity")]
    pub max_capacity: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_memory_capacity(),
        }
    }
}

/// 限流策略（每操作类别单独调参）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 窗口长度（秒）
    #[serde(default = "default_limit_window_secs")]
    pub window_secs: u64,
    /// 重定向解析：宽松，正常分享会突发
    #[serde(default = "default_redirect_per_window")]
    pub redirect_per_window: u32,
    /// 创建短链：收紧
    #[serde(default = "default_shorten_per_window")]
    pub shorten_per_window: u32,
    /// 密码验证：非常紧，钝化暴力破解
    #[serde(default = "default_verify_per_window")]
    pub verify_per_window: u32,
    /// 单次限流判定超时（毫秒），超时 fail-open
    #[serde(default = "default_limiter_timeout_ms")]
    pub check_timeout_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_limit_window_secs(),
            redirect_per_window: default_redirect_per_window(),
            shorten_per_window: default_shorten_per_window(),
            verify_per_window: default_verify_per_window(),
            check_timeout_ms: default_limiter_timeout_ms(),
        }
    }
}

/// 分析统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// 访问事件队列的 Redis key
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
    /// 单次聚合批量上限
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 聚合间隔（秒）
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// 入队超时（毫秒）：队列故障不许拖慢重定向
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
    /// 承载国家码的可信边缘 header
    #[serde(default = "default_country_header")]
    pub country_header: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            queue_key: default_queue_key(),
            batch_size: default_batch_size(),
            flush_interval_secs: default_flush_interval_secs(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
            country_header: default_country_header(),
        }
    }
}

/// 终态页面路径（前端路由，核心只负责 302 过去）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    #[serde(default = "default_page_not_found")]
    pub not_found: String,
    #[serde(default = "default_page_disabled")]
    pub disabled: String,
    #[serde(default = "default_page_expired")]
    pub expired: String,
    /// 密码输入页，短码以路径段追加
    #[serde(default = "default_page_password")]
    pub password: String,
    /// 不安全链接的警示插页，短码以路径段追加
    #[serde(default = "default_page_warning")]
    pub warning: String,
    /// 端到端加密链接的客户端解密页，短码以路径段追加
    #[serde(default = "default_page_decrypt")]
    pub decrypt: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            not_found: default_page_not_found(),
            disabled: default_page_disabled(),
            expired: default_page_expired(),
            password: default_page_password(),
            warning: default_page_warning(),
            decrypt: default_page_decrypt(),
        }
    }
}

/// 验证凭据配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 为空时启动阶段生成随机值（重启后已签发凭据失效）
    #[serde(default)]
    pub jwt_secret: String,
    /// 密码验证凭据的有效期（分钟）
    #[serde(default = "default_verify_token_minutes")]
    pub verify_token_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            verify_token_minutes: default_verify_token_minutes(),
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
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "sqlite://hoplink.db".to_string()
}

fn default_database_pool_size() -> u32 {
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

fn default_cache_type() -> String {
    "memory".to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_key_prefix() -> String {
    "hoplink:".to_string()
}

fn default_memory_capacity() -> u64 {
    10_000
}

fn default_limit_window_secs() -> u64 {
    60
}

fn default_redirect_per_window() -> u32 {
    100
}

fn default_shorten_per_window() -> u32 {
    10
}

fn default_verify_per_window() -> u32 {
    5
}

fn default_limiter_timeout_ms() -> u64 {
    200
}

fn default_queue_key() -> String {
    "hoplink:visits".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_flush_interval_secs() -> u64 {
    5
}

fn default_enqueue_timeout_ms() -> u64 {
    150
}

fn default_country_header() -> String {
    "cf-ipcountry".to_string()
}

fn default_page_not_found() -> String {
    "/404".to_string()
}

fn default_page_disabled() -> String {
    "/link/disabled".to_string()
}

fn default_page_expired() -> String {
    "/link/expired".to_string()
}

fn default_page_password() -> String {
    "/protected".to_string()
}

fn default_page_warning() -> String {
    "/warning".to_string()
}

fn default_page_decrypt() -> String {
    "/decrypt".to_string()
}

fn default_verify_token_minutes() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "plain".to_string()
}
