//! Tracing subscriber setup.
//!
//! Logs always go to stderr so stdout stays free for command output and
//! stdio transports.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `redlink=info,redlink_client=info,redlink_config=info`)
//! - `LOG_FORMAT`: `json` for JSON lines, anything else for compact text
//! - `LOG_DIR`: when set, also write JSON logs to a daily-rolling file there

use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "redlink=info,redlink_client=info,redlink_config=info";

/// Output format for the console layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Installs the global subscriber.
///
/// Returns a guard that flushes the file writer on drop; keep it alive for
/// the life of the process.
///
/// # Panics
///
/// Panics if `LOG_DIR` is set and the directory cannot be created.
pub fn init_tracing() -> Option<WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = match LogFormat::from_env() {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_filter(console_filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .compact()
            .with_filter(console_filter)
            .boxed(),
    };

    let Ok(log_dir) = std::env::var("LOG_DIR") else {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    };

    fs::create_dir_all(&log_dir).expect("Failed to create logs directory");

    // JSON file layer for structured logs (can be ingested by Loki)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "redlink.json");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_ansi(false)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    Some(guard)
}
