use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps the non-blocking file writer alive; logs are flushed on drop.
pub struct LogGuard(#[allow(dead_code)] Option<WorkerGuard>);

/// Overrides from the command line or the environment.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub filter: Option<String>,
}

const LOG_FILE: &str = "mediactl.log";
const DEFAULT_FILTER: &str = "info";

/// Where log files go: the configured directory, else `{data_dir}/logs`.
pub fn log_dir(data_dir: &Path, cfg: &LogConfig) -> PathBuf {
    cfg.dir.clone().unwrap_or_else(|| data_dir.join("logs"))
}

/// Explicit filter first, then `RUST_LOG`, then `info`. An invalid filter
/// falls back to the default.
fn filter(cfg: &LogConfig) -> EnvFilter {
    match cfg.filter.as_deref() {
        Some(s) if !s.trim().is_empty() => {
            EnvFilter::try_new(s).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Installs the global subscriber with a daily rolling file layer. Falls
/// back to a temp directory when the log directory cannot be created.
/// Keep the returned guard alive for the life of the process.
pub fn init(data_dir: &Path, cfg: LogConfig) -> LogGuard {
    let log_dir = log_dir(data_dir, &cfg);
    let log_dir = match fs::create_dir_all(&log_dir) {
        Ok(()) => log_dir,
        Err(_) => std::env::temp_dir().join("mediactl-logs"),
    };
    let _ = fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer);

    let subscriber = tracing_subscriber::registry()
        .with(filter(&cfg))
        .with(file_layer);

    let _ = subscriber.try_init();
    tracing::info!(log_dir = %log_dir.display(), "tracing initialised");

    LogGuard(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_defaults_under_data_dir() {
        let cfg = LogConfig::default();
        assert_eq!(
            log_dir(Path::new("/data"), &cfg),
            PathBuf::from("/data/logs")
        );
        let cfg = LogConfig {
            dir: Some(PathBuf::from("/var/log/mediactl")),
            filter: None,
        };
        assert_eq!(
            log_dir(Path::new("/data"), &cfg),
            PathBuf::from("/var/log/mediactl")
        );
    }
}
