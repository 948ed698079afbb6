use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use clap::Parser;

pub const SNAPSHOT_FILE: &str = "db";
pub const REQUEST_LOG_FILE: &str = "request.log";

#[derive(Debug, Clone, Parser)]
#[command(name = "stampd")]
#[command(about = "Records begin/finish time stamps per day and serves them over HTTP")]
pub struct AppConfig {
    /// Directory holding the snapshot file and the request log.
    #[arg(long, default_value = "./")]
    pub log_path: String,

    /// HTTP port to listen on.
    #[arg(long, default_value_t = 80)]
    pub port: u16,

    /// Offset from UTC used to derive the current day and time of day.
    #[arg(
        long,
        default_value = "+08:00",
        value_parser = parse_offset,
        allow_hyphen_values = true
    )]
    pub utc_offset: FixedOffset,

    /// Log level for stdout (e.g. "info", "debug").
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Seconds between automatic snapshot saves. Unset means only save on
    /// shutdown.
    #[arg(long)]
    pub snapshot_interval: Option<u64>,

    /// Seconds in-flight requests get to finish after a shutdown signal.
    #[arg(long, default_value_t = 30)]
    pub shutdown_grace: u64,
}

impl AppConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.log_path).join(SNAPSHOT_FILE)
    }

    pub fn request_log_path(&self) -> PathBuf {
        PathBuf::from(&self.log_path).join(REQUEST_LOG_FILE)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }

    pub fn snapshot_interval(&self) -> Option<Duration> {
        self.snapshot_interval
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

fn parse_offset(s: &str) -> Result<FixedOffset, String> {
    s.parse::<FixedOffset>()
        .map_err(|e| format!("expected an offset like +08:00: {e}"))
}
