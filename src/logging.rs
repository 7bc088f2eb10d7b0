//! Logging setup

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Diagnostic log file name, separate from the summary file
pub const DEBUG_LOG_FILE: &str = "proxy-bench.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging for a run
///
/// With the live view up the terminal belongs to the table, so logs go to
/// `proxy-bench.log` in `log_dir`. Headless runs log to stderr. The level
/// comes from RUST_LOG and defaults to "info".
///
/// The returned guard flushes the file writer on drop and must be held for
/// the program lifetime.
pub fn init_logging(headless: bool, log_dir: &Path) -> Option<WorkerGuard> {
    if headless {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        return None;
    }

    let file_appender = tracing_appender::rolling::never(log_dir, DEBUG_LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}
