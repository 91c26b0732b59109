//! Logging Infrastructure
//!
//! Console logging by default, daily rolling files when a log directory is
//! configured and exists.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "path-desk";

/// Initialize the logger at `info` on the console
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` takes precedence over `log_level` when set. A `log_dir` that
/// does not exist is ignored and logging stays on the console.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, LOG_FILE_PREFIX);
            let _ = subscriber.with_ansi(false).with_writer(file_appender).try_init();
            return;
        }
    }

    // Console output goes to stderr, stdout carries command output
    let _ = subscriber.with_writer(std::io::stderr).try_init();
}
