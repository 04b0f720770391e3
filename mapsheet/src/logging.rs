use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "mapsheet";
const MAX_LOG_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Keeps the file writer flushing until dropped.
#[allow(dead_code)]
pub struct LoggerGuard(Option<WorkerGuard>);

fn filter_for(level: &str) -> EnvFilter {
    let level = if LEVELS.contains(&level) { level } else { "info" };
    EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .unwrap_or_else(|_| LevelFilter::INFO.into()),
        )
        .parse_lossy(std::env::var("RUST_LOG").unwrap_or_default())
}

/// Log to stdout and, when `log_dir` is given, to a daily rolling file.
/// `RUST_LOG` overrides `level`.
pub fn init_logging(log_dir: Option<&Path>, level: &str) -> anyhow::Result<LoggerGuard> {
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(filter_for(level));

    let (file_layer, guard) = match log_dir {
        Some(log_dir) => {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(log_dir)?;
            let (non_blocking, guard) = NonBlocking::new(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter_for(level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    if !LEVELS.contains(&level) {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }

    if let Some(log_dir) = log_dir {
        match cleanup_old_logs(log_dir, LOG_FILE_PREFIX, MAX_LOG_AGE) {
            Ok(0) => {}
            Ok(n) => tracing::info!("Deleted {} old log files", n),
            Err(e) => tracing::warn!("Failed to delete old log files: {}", e),
        }
    }

    Ok(LoggerGuard(guard))
}

fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut deleted = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !(file_name.starts_with(prefix) && file_name.ends_with(".log")) {
            continue;
        }
        if let Ok(modified) = fs::metadata(&path)?.modified() {
            if now.duration_since(modified).unwrap_or_default() > max_age {
                fs::remove_file(&path)?;
                deleted += 1;
            }
        }
    }
    Ok(deleted)
}
