//! Tracing setup
//!
//! Stdout always; a daily rolling file as well when the config asks for it.

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "learner.log";

/// Keeps the non-blocking file writer flushing; drop it on shutdown.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_writer(config: &Config) -> Option<(NonBlocking, WorkerGuard)> {
    if !config.file_logs {
        return None;
    }
    let dir = &config.log_dir;
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("failed to create log directory {dir}: {err}");
        return None;
    }
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir);
    match appender {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(err) => {
            eprintln!("failed to open log file in {dir}: {err}");
            None
        }
    }
}

/// Installs the global subscriber. Returns a guard only when file output is
/// on and this call installed the subscriber; later calls keep the first one.
///
/// ```no_run
/// use danci_learner_service::{logging, Config};
///
/// let config = Config::from_env();
/// let _guard = logging::init_tracing(&config);
/// tracing::info!(level = %config.log_level, "learner service ready");
/// ```
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let (file_layer, guard) = match file_writer(config) {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .ok()?;

    guard.map(|guard| FileLogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    // the only test in this binary that installs a subscriber
    #[test]
    fn test_file_logging_from_config() {
        let tmp = tempfile::tempdir().unwrap();
        let log_dir = tmp.path().join("nested");
        let dir = log_dir.to_string_lossy().into_owned();
        let config = Config::from_lookup(|key| match key {
            "RUST_LOG" => Some("debug".to_string()),
            "ENABLE_FILE_LOGS" => Some("1".to_string()),
            "LOG_DIR" => Some(dir.clone()),
            _ => None,
        });

        let guard = init_tracing(&config);
        assert!(guard.is_some());
        tracing::info!("written to the rolling file");
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(&log_dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX))
            .collect();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(files[0].path()).unwrap();
        assert!(contents.contains("written to the rolling file"));

        // already installed: nothing new, no guard
        assert!(init_tracing(&Config::default()).is_none());
    }
}
