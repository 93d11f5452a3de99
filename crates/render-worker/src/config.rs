//! Worker-level configuration: everything that isn't already owned by one
//! of the lower crates' own `*Config::from_env()`.

use std::time::Duration;

use render_db::DbConfig;
use render_queue::QueueConfig;
use render_storage::ObjectStoreConfig;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub work_dir: String,
    pub poll_interval: Duration,
    pub claim_interval: Duration,
    pub claim_min_idle: Duration,
    pub shutdown_timeout: Duration,
    pub http_port: u16,
    pub shared_secret: Option<String>,
    pub asset_concurrency: usize,
    pub presign_expiry: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/render-worker".to_string(),
            poll_interval: Duration::from_secs(5),
            claim_interval: Duration::from_secs(60),
            claim_min_idle: Duration::from_secs(600),
            shutdown_timeout: Duration::from_secs(30),
            http_port: 8080,
            shared_secret: None,
            asset_concurrency: 4,
            presign_expiry: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            work_dir: std::env::var("RENDER_WORKER_WORK_DIR").unwrap_or(default.work_dir),
            poll_interval: Duration::from_millis(
                std::env::var("RENDER_WORKER_POLL_INTERVAL_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(5_000),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("RENDER_WORKER_CLAIM_INTERVAL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(60),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("RENDER_WORKER_CLAIM_MIN_IDLE_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(600),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("RENDER_WORKER_SHUTDOWN_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30),
            ),
            http_port: std::env::var("RENDER_WORKER_HTTP_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8080),
            shared_secret: std::env::var("RENDER_WORKER_SHARED_SECRET").ok(),
            asset_concurrency: std::env::var("RENDER_WORKER_ASSET_CONCURRENCY").ok().and_then(|s| s.parse().ok()).unwrap_or(4),
            presign_expiry: Duration::from_secs(
                std::env::var("RENDER_WORKER_PRESIGN_EXPIRY_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(3600),
            ),
        }
    }
}

/// The full set of env-backed config this binary composes at startup.
pub struct AppConfig {
    pub worker: WorkerConfig,
    pub db: DbConfig,
    pub queue: QueueConfig,
    pub storage: ObjectStoreConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, crate::error::WorkerError> {
        Ok(Self {
            worker: WorkerConfig::from_env(),
            db: DbConfig::from_env().map_err(|e| crate::error::WorkerError::config_error(e.to_string()))?,
            queue: QueueConfig::from_env(),
            storage: ObjectStoreConfig::from_env().map_err(|e| crate::error::WorkerError::config_error(e.to_string()))?,
        })
    }
}
