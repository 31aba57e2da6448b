//! Logging for webcore
//!
//! The hub and its managers log through `tracing` with structured fields
//! (plugin ids, endpoint ids, URIs). This module re-exports the macros and
//! installs a global subscriber on request. Output defaults to JSON on STDOUT.
//!
//! ```no_run
//! use webcore_core::logging::*;
//!
//! let _guard = LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .with_env_filter("webcore_core=trace")
//!     .init()
//!     .expect("logging");
//!
//! info!(plugin = "webcore.demo", "plugin loaded");
//! ```

use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of emitted events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    Plain,
    /// Multi-line and colored, for development
    Pretty,
    Compact,
}

/// Where events are written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogSink {
    #[default]
    Stdout,
    Stderr,
    /// Daily rotated files `<prefix>.<date>` under a directory
    Daily { directory: PathBuf, prefix: String },
}

impl LogSink {
    fn writer(&self) -> (NonBlocking, WorkerGuard) {
        match self {
            LogSink::Stdout => tracing_appender::non_blocking(std::io::stdout()),
            LogSink::Stderr => tracing_appender::non_blocking(std::io::stderr()),
            LogSink::Daily { directory, prefix } => {
                tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, prefix))
            }
        }
    }
}

/// Subscriber setup; `init` installs it globally.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub sink: LogSink,
    /// Directives appended after the base level, e.g. `webcore_core::sitemap=trace`
    pub env_filter: Option<String>,
    pub with_targets: bool,
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            with_targets: true,
            ..Self::default()
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_env_filter(mut self, directives: impl Into<String>) -> Self {
        self.env_filter = Some(directives.into());
        self
    }

    pub fn with_targets(mut self, enabled: bool) -> Self {
        self.with_targets = enabled;
        self
    }

    /// Filter directives: the base level followed by any extra directives.
    pub fn directives(&self) -> String {
        match &self.env_filter {
            Some(extra) if !extra.trim().is_empty() => format!("{},{}", self.level, extra.trim()),
            _ => self.level.to_string(),
        }
    }

    /// Install the global subscriber.
    ///
    /// The returned guard flushes buffered events when dropped and must be
    /// kept alive for as long as logging is wanted. Fails when a global
    /// subscriber is already set or a directive does not parse.
    pub fn init(&self) -> Result<WorkerGuard, Error> {
        let filter = EnvFilter::try_new(self.directives())
            .map_err(|e| Error::Config(format!("invalid log filter: {e}")))?;
        let (writer, guard) = self.sink.writer();

        let base = fmt::layer().with_writer(writer).with_target(self.with_targets);
        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            LogFormat::Json => base.json().with_filter(filter).boxed(),
            LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
            LogFormat::Compact => base.compact().with_filter(filter).boxed(),
            LogFormat::Plain => base.with_ansi(false).with_filter(filter).boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .try_init()
            .map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;
        Ok(guard)
    }
}
