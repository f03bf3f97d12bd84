use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_NAME: &str = "tf2-companion.log";
const LOG_KEEP_DAYS: u64 = 7;

/// Install console + daily rolling file logging. Keep the guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn init_logging() -> WorkerGuard {
    let log_dir = get_log_directory();

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_writer);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Warning: Logging already initialized: {}", e);
    }

    tracing::info!("Logging initialized, log directory: {}", log_dir.display());
    tracing::info!("TF2 companion version: {}", env!("CARGO_PKG_VERSION"));

    cleanup_old_logs(&log_dir, LOG_KEEP_DAYS);

    guard
}

fn get_log_directory() -> PathBuf {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tf2-companion")
        .join("logs");

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    log_dir
}

/// Remove rotated log files older than `keep_days`; the active file is left alone
fn cleanup_old_logs(log_dir: &Path, keep_days: u64) {
    let Some(cutoff) =
        SystemTime::now().checked_sub(Duration::from_secs(keep_days * 24 * 60 * 60))
    else {
        return;
    };

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read log directory for cleanup: {}", e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.starts_with(LOG_FILE_NAME) && name != LOG_FILE_NAME => {}
            _ => continue,
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };

        if modified < cutoff {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
            } else {
                tracing::debug!("Removed old log file: {:?}", path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    #[test]
    fn test_cleanup_only_touches_old_rotated_logs() {
        let dir = tempfile::tempdir().unwrap();
        let old_rotated = dir.path().join(format!("{}.2020-01-01", LOG_FILE_NAME));
        let new_rotated = dir.path().join(format!("{}.2099-01-01", LOG_FILE_NAME));
        let unrelated = dir.path().join("notes.txt");
        for path in [&old_rotated, &new_rotated, &unrelated] {
            fs::write(path, b"log").unwrap();
        }

        let long_ago = SystemTime::now() - Duration::from_secs(30 * 24 * 60 * 60);
        for path in [&old_rotated, &unrelated] {
            File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(long_ago)
                .unwrap();
        }

        cleanup_old_logs(dir.path(), LOG_KEEP_DAYS);
        assert!(!old_rotated.exists());
        assert!(new_rotated.exists());
        assert!(unrelated.exists());
    }
}
