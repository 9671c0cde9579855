//! Process-wide logging setup.
//!
//! Installed once at startup, not per session. Two layers share one filter:
//! - a daily rotating UTF-8 file in `LogConfig::dir`, written off-thread
//! - a console layer, colored only when stdout is a terminal
//!
//! Each line carries the RFC3339 UTC timestamp, level, `file:line`, the span
//! stack with its fields (so `session_id` shows up on everything emitted
//! inside a bootstrap), and the message.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogConfig;
use crate::errors::SessionError;

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Creates the log directory if needed and returns it.
pub fn ensure_log_dir(cfg: &LogConfig) -> Result<PathBuf, SessionError> {
    fs::create_dir_all(&cfg.dir)?;
    Ok(cfg.dir.clone())
}

/// `RUST_LOG` if set and valid, otherwise the configured default.
pub fn env_filter(cfg: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.default_filter))
}

/// Builds the subscriber without installing it.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for as long as logging is needed.
pub fn build_subscriber(
    cfg: &LogConfig,
    filter: EnvFilter,
) -> Result<(impl Subscriber + Send + Sync + 'static, WorkerGuard), SessionError> {
    let dir = ensure_log_dir(cfg)?;
    let appender = rolling::daily(dir, &cfg.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_timer(ChronoRfc3339Utc)
        .with_ansi(false)
        .with_level(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_timer(ChronoRfc3339Utc)
        .with_ansi(io::stdout().is_terminal())
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer);

    Ok((subscriber, guard))
}

/// Installs the global subscriber. Call once, early in `main`.
///
/// # Errors
/// Fails if the log directory cannot be created or a global subscriber is
/// already installed.
pub fn init(cfg: &LogConfig) -> Result<WorkerGuard, SessionError> {
    let (subscriber, guard) = build_subscriber(cfg, env_filter(cfg))?;
    subscriber
        .try_init()
        .map_err(|e| SessionError::Telemetry(e.to_string()))?;
    Ok(guard)
}
