use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Map a textual level to a filter; unknown values fall back to `info`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Install the global subscriber.
///
/// Everything at `level` goes to stdout. HTTP request traces are also
/// appended to `request_log`. Keep the returned guard alive until exit or
/// buffered request log lines are lost.
pub fn init(level: &str, request_log: &Path) -> io::Result<WorkerGuard> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(request_log)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let stdout_layer = fmt::layer().with_target(false).with_filter(parse_level(level));

    let request_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(Targets::new().with_target("tower_http", LevelFilter::INFO));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(request_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(guard)
}
