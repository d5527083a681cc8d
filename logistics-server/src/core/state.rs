//! Server State
//!
//! `ServerState` 持有所有服务的共享引用，使用 Arc 实现浅拷贝。
//! 事件总线、缓存、队列都是显式构造后注入的实例，没有全局单例。

use std::sync::{Arc, Mutex};

use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::activity::ActivityLogService;
use crate::auth::{JwtService, RefreshTokenStore};
use crate::cache::CacheService;
use crate::core::Config;
use crate::db::DbService;
use crate::events::{EmailService, EventBus, register_observers};
use crate::jobs::{JobOptions, JobQueue, ReportWorker};
use crate::reports::ReportConfig;
use crate::utils::AppResult;

/// 服务器状态 - 持有所有服务的单例引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | pool | SQLite 连接池 |
/// | jwt | JWT 认证服务 |
/// | cache | TTL 缓存 (幂等 + 刷新令牌) |
/// | events | 事件总线 (观察者已注册) |
/// | queue | 报表任务队列 |
/// | refresh_tokens | 刷新令牌存储 |
/// | activity | 活动日志服务 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub jwt: Arc<JwtService>,
    pub cache: Arc<CacheService>,
    pub events: Arc<EventBus>,
    pub queue: Arc<JobQueue>,
    pub refresh_tokens: RefreshTokenStore,
    pub activity: Arc<ActivityLogService>,
    /// 报表队列接收端，由 start_background_tasks 取走
    report_rx: Arc<Mutex<Option<mpsc::Receiver<u64>>>>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：数据目录 → 数据库 (含迁移) → 缓存 → 事件总线
    /// (注册观察者) → 队列 → 活动日志。
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let email = EmailService::from_relay_url(config.mail_relay_url.as_deref());
        Self::initialize_with_email(config, email).await
    }

    /// 使用指定的邮件服务初始化 (测试注入 RecordingTransport 用)
    pub async fn initialize_with_email(config: &Config, email: EmailService) -> AppResult<Self> {
        config.ensure_data_dir_structure()?;

        let db = DbService::new(&config.database_path().to_string_lossy()).await?;

        let cache = Arc::new(CacheService::new());
        let jwt = Arc::new(JwtService::with_config(config.jwt.clone()));

        let events = Arc::new(EventBus::new());
        register_observers(&events, Arc::new(email));

        let (queue, report_rx) = JobQueue::new(config.job_queue_buffer_size, JobOptions::default());
        let activity = Arc::new(ActivityLogService::new(config.activity_buffer_size));
        let refresh_tokens = RefreshTokenStore::new(cache.clone(), config.refresh_token_ttl_secs);

        Ok(Self {
            config: config.clone(),
            pool: db.pool,
            jwt,
            cache,
            events,
            queue,
            refresh_tokens,
            activity,
            report_rx: Arc::new(Mutex::new(Some(report_rx))),
        })
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用。启动的任务：
    /// - 报表 worker (消费队列)
    /// - 活动日志写入器
    /// - 缓存过期清理
    pub fn start_background_tasks(&self) {
        let report_rx = self
            .report_rx
            .lock()
            .expect("report receiver mutex poisoned")
            .take();
        match report_rx {
            Some(rx) => {
                let worker = ReportWorker::new(
                    self.queue.clone(),
                    self.pool.clone(),
                    ReportConfig {
                        reports_dir: self.config.reports_dir(),
                        page_size: self.config.report_page_size,
                    },
                );
                tokio::spawn(worker.run(rx));
            }
            None => {
                tracing::warn!("Background tasks already started");
                return;
            }
        }

        self.activity.start_worker(self.pool.clone());
        self.cache.spawn_sweeper(self.config.cache_sweep_interval_secs);
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("environment", &self.config.environment)
            .finish_non_exhaustive()
    }
}
