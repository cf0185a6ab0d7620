use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Console logging plus an optional plain-text log file.
///
/// `TRACING_LEVEL` takes precedence over the configured level. Keep the
/// returned guard alive until exit so buffered file lines are flushed.
pub fn init_logger(level: &str, log_file: Option<(PathBuf, OsString)>) -> Option<WorkerGuard> {
    let filter_layer =
        EnvFilter::try_from_env("TRACING_LEVEL").unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match &log_file {
        Some((dir, file_name)) => {
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(file_layer)
        .with(filter_layer)
        .init();

    match log_file {
        Some((dir, file_name)) => debug!(
            "Logging to stderr and {}",
            dir.join(file_name).display()
        ),
        None => debug!("Logging to stderr only"),
    }

    guard
}
