use std::fs::OpenOptions;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;

/// Environment variable naming a log file to append to instead of stderr.
pub const LOG_PATH_ENV: &str = "DEATHWATCH_LOG_PATH";

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var(LOG_PATH_ENV)
        && let Ok(file) = OpenOptions::new().create(true).append(true).open(&path)
    {
        let (writer, guard) = tracing_appender::non_blocking(file);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
            .init();
        return Some(guard);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    None
}
