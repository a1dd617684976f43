//! [`Scheduler`] — the top-level facade a binary constructs: owns the
//! [`Dispatcher`] task, the [`JobQueue`], and (optionally) the default
//! log subscriber.
//!
//! Mirrors the original `Scheduler` class, which wrapped a
//! `WorkerManager` thread and exposed `has_jobs()` / `end()` / `queue`.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::dispatcher::Dispatcher;
use crate::error::{SchedulerError, StoreError};
use crate::queue::JobQueue;
use crate::registry::WorkerRegistry;
use crate::store::JobStore;

/// `log.format`: which `tracing_subscriber::fmt` layer to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging section of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Path to a log file. When unset, logs go to stderr and rotation
    /// settings are ignored.
    pub file: Option<String>,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"info"` or
    /// `"jobkeeper=debug,warn"`. Overridden by `RUST_LOG` if set.
    pub level: Option<String>,
    /// `"pretty"` (default) or `"json"`.
    #[serde(default)]
    pub format: LogFormat,
    /// Rotate the log file once it would exceed this size. 0 disables
    /// size-based rotation, matching Python `RotatingFileHandler`'s
    /// `maxBytes=0` convention.
    #[serde(default = "default_log_max_size_mb")]
    pub max_size_mb: u64,
    /// Number of rotated backups to retain (`file.log.1`, `file.log.2`,
    /// ...). 0 disables rotation entirely, regardless of `max_size_mb`.
    #[serde(default = "default_log_max_files")]
    pub max_files: usize,
}

fn default_log_max_size_mb() -> u64 {
    50
}

fn default_log_max_files() -> usize {
    1
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            file: None,
            level: None,
            format: LogFormat::default(),
            max_size_mb: default_log_max_size_mb(),
            max_files: default_log_max_files(),
        }
    }
}

/// Database connection section of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    /// Max `sqlx::PgPool` connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_db_port() -> u16 {
    5432
}

fn default_pool_size() -> u32 {
    5
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: "localhost".to_string(),
            port: default_db_port(),
            name: "jobkeeper".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            pool_size: default_pool_size(),
        }
    }
}

impl DbConfig {
    /// Builds a `postgres://` connection string suitable for
    /// `jobkeeper_postgres::PgJobStore::connect`.
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

/// Top-level configuration file schema (TOML).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl SchedulerConfig {
    /// Loads configuration from a TOML file. Any field the file omits
    /// keeps its `Default`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| SchedulerError::ConfigRead {
                path: path.display().to_string(),
                source,
            })?;
        toml::from_str(&contents).map_err(|source| SchedulerError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Owns the dispatch loop and exposes the enqueue-facing [`JobQueue`].
pub struct Scheduler {
    queue: JobQueue,
    dispatcher: Arc<Dispatcher>,
    loop_handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Builds a scheduler over `store` with `registry` as its worker
    /// table. Does not start the dispatch loop — call [`Scheduler::start`].
    pub fn new(store: Arc<dyn JobStore>, registry: WorkerRegistry) -> Self {
        let queue = JobQueue::new(store);
        let dispatcher = Arc::new(Dispatcher::new(queue.clone(), registry));
        Scheduler {
            queue,
            dispatcher,
            loop_handle: None,
        }
    }

    /// Initializes the default log subscriber from `config`, then
    /// constructs a scheduler. The returned [`tracing_appender::non_blocking::WorkerGuard`],
    /// if any, must be kept alive for the process lifetime.
    pub fn with_default_logging(
        store: Arc<dyn JobStore>,
        registry: WorkerRegistry,
        config: &SchedulerConfig,
    ) -> Result<(Self, Option<tracing_appender::non_blocking::WorkerGuard>), SchedulerError> {
        let guard = crate::logging::init(&config.log)?;
        Ok((Self::new(store, registry), guard))
    }

    /// Spawns the dispatch loop as a background task. Idempotent: a
    /// second call while already running is a no-op.
    pub fn start(&mut self) {
        if self.loop_handle.is_some() {
            return;
        }
        let dispatcher = self.dispatcher.clone();
        self.loop_handle = Some(tokio::spawn(async move {
            dispatcher.run().await;
        }));
    }

    /// The client-facing queue API for enqueuing and inspecting jobs.
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Whether any job, claimed or not, currently exists.
    pub async fn has_jobs(&self) -> Result<bool, StoreError> {
        self.queue.has_jobs().await
    }

    /// Signals the dispatch loop to stop and waits for it (and every
    /// in-flight worker task) to finish. Mirrors the original `end()`.
    pub async fn end(&mut self) {
        self.dispatcher.stop().await;
        if let Some(handle) = self.loop_handle.take() {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "dispatch loop task panicked");
            }
        }
    }
}
