use std::path::PathBuf;

use crate::auth::JwtConfig;
use crate::utils::AppError;

/// 服务器配置 - 所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATA_DIR | ./data | 数据目录 (数据库 + 报表文件) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | HUB_CITY | Pokhara | 运价起点城市 (固定 hub) |
/// | REFRESH_TOKEN_TTL_SECONDS | 2592000 | 刷新令牌有效期 (30 天) |
/// | IDEMPOTENCY_TTL_SECONDS | 86400 | 幂等记录有效期 (24 小时) |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时 (毫秒) |
/// | REPORT_PAGE_SIZE | 2000 | 报表导出分页大小 |
/// | CACHE_SWEEP_INTERVAL_SECONDS | 60 | 缓存过期清理间隔 |
/// | MAIL_RELAY_URL | (unset) | HTTP 邮件中继地址，未设置时仅记录日志 |
///
/// # 示例
///
/// ```ignore
/// DATA_DIR=/var/lib/logistics HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 数据目录，存储数据库和报表文件
    pub data_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运价起点城市
    pub hub_city: String,
    /// 刷新令牌有效期 (秒)
    pub refresh_token_ttl_secs: u64,
    /// 幂等记录有效期 (秒)
    pub idempotency_ttl_secs: u64,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 报表导出分页大小
    pub report_page_size: i64,
    /// 缓存清理间隔 (秒)
    pub cache_sweep_interval_secs: u64,
    /// HTTP 邮件中继地址
    pub mail_relay_url: Option<String>,
    /// 活动日志通道容量
    pub activity_buffer_size: usize,
    /// 报表队列通道容量
    pub job_queue_buffer_size: usize,
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            jwt: JwtConfig::default(),
            hub_city: std::env::var("HUB_CITY").unwrap_or_else(|_| "Pokhara".into()),
            refresh_token_ttl_secs: std::env::var("REFRESH_TOKEN_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30 * 24 * 60 * 60),
            idempotency_ttl_secs: std::env::var("IDEMPOTENCY_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24 * 60 * 60),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
            report_page_size: std::env::var("REPORT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
            cache_sweep_interval_secs: std::env::var("CACHE_SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            mail_relay_url: std::env::var("MAIL_RELAY_URL").ok().filter(|v| !v.is_empty()),
            activity_buffer_size: 1024,
            job_queue_buffer_size: 64,
        }
    }

    /// 使用自定义值覆盖部分配置，常用于测试场景
    pub fn with_overrides(data_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.data_dir = data_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("logistics.db")
    }

    /// 报表输出目录
    pub fn reports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("reports")
    }

    /// 确保数据目录结构存在
    pub fn ensure_data_dir_structure(&self) -> Result<(), AppError> {
        for dir in [PathBuf::from(&self.data_dir), self.reports_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::internal(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
