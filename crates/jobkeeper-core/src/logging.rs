//! Default `tracing` subscriber setup, driven by [`crate::scheduler::LogConfig`].
//!
//! A deployment that wants custom subscriber wiring (e.g. exporting to an
//! external collector) can skip this module entirely and call
//! `tracing::subscriber::set_global_default` itself before constructing a
//! [`crate::scheduler::Scheduler`].

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::scheduler::{LogConfig, LogFormat};

/// A `std::io::Write` sink that rolls `path` over to `path.1`, `path.2`,
/// ... once it would exceed `max_bytes`, keeping at most `max_files`
/// backups. Grounded on the original's use of Python's
/// `logging.handlers.RotatingFileHandler(maxBytes=, backupCount=)`;
/// `tracing-appender` only ships time-based rolling, not size+count, so
/// this fills that gap directly rather than pulling in another crate.
struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    fn open(path: PathBuf, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(RotatingFile {
            path,
            max_bytes,
            max_files,
            file,
            written,
        })
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        if self.max_files == 0 {
            return Ok(());
        }
        let oldest = self.backup_path(self.max_files);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        for n in (1..self.max_files).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                std::fs::rename(&from, self.backup_path(n + 1))?;
            }
        }
        std::fs::rename(&self.path, self.backup_path(1))?;
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_bytes > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Initializes the global `tracing` subscriber from `config`.
///
/// Returns the [`WorkerGuard`] for the non-blocking file writer, if a log
/// file was configured — it must be kept alive for the process lifetime
/// or buffered lines are dropped on exit.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, crate::error::SchedulerError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_deref().unwrap_or("info")));
    let json = config.format == LogFormat::Json;

    let Some(path) = config.file.as_deref() else {
        let builder = fmt().with_env_filter(filter);
        if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        }
        .map_err(|err| crate::error::SchedulerError::Logging(err.to_string()))?;
        return Ok(None);
    };

    let writer = RotatingFile::open(
        Path::new(path).to_path_buf(),
        config.max_size_mb.saturating_mul(1024 * 1024),
        config.max_files,
    )
    .map_err(|source| crate::error::SchedulerError::ConfigRead {
        path: path.to_string(),
        source,
    })?;
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);

    let builder = fmt().with_env_filter(filter).with_writer(non_blocking);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|err| crate::error::SchedulerError::Logging(err.to_string()))?;

    Ok(Some(guard))
}
