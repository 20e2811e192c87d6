//! Process-level logging setup for agent-tally binaries.
//!
//! Libraries in the workspace only emit `tracing` events. A binary calls
//! [`init_logging`] once at startup and keeps the returned [`LogGuard`] alive
//! until exit so buffered file output is flushed.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither an explicit filter nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "warn,agent_tally_core=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines on stderr.
    #[default]
    Text,
    /// One JSON object per event on stderr.
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Explicit filter directive; wins over `RUST_LOG`.
    pub filter: Option<String>,
    pub format: LogFormat,
    /// When set, events are also written as JSON lines to a daily rolling
    /// file in this directory.
    pub log_dir: Option<PathBuf>,
}

/// Keeps the non-blocking file writer alive. Dropping it flushes pending
/// entries.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// File name prefix of rolling log files (`agent-tally.log.YYYY-MM-DD`).
const LOG_FILE_PREFIX: &str = "agent-tally.log";

/// Resolve the filter: explicit directive, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`].
pub fn build_filter(explicit: Option<&str>) -> anyhow::Result<EnvFilter> {
    match explicit {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter '{directive}'")),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<LogGuard> {
    let filter = build_filter(config.filter.as_deref())?;

    let (file_layer, file_guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (text_layer, json_layer) = match config.format {
        LogFormat::Text => (
            Some(fmt::layer().with_writer(std::io::stderr).with_target(true).compact()),
            None,
        ),
        LogFormat::Json => (None, Some(fmt::layer().with_writer(std::io::stderr).json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(format = ?config.format, log_dir = ?config.log_dir, "logging initialized");

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
