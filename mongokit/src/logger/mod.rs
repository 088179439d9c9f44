//! Command logging for MongoDB driver events.
//!
//! The driver reports every command it sends as a started event followed by
//! either a succeeded or a failed event, correlated by request id. A
//! [`CommandLogger`] remembers the started command, and when the matching
//! terminal event arrives it classifies the command as an error, a slow
//! command, or a normal one. It then writes a console line and hands a JSON
//! [`LogRecord`] to an optional [`RecordHandler`].
//!
//! ```rust
//! use std::time::Duration;
//! use mongokit::logger::{CommandLogger, LogLevel, LoggerConfig};
//!
//! let config = LoggerConfig {
//!     level: LogLevel::Warn,
//!     console: false,
//!     ..LoggerConfig::default()
//! };
//! let logger = CommandLogger::new(config);
//!
//! // 350ms over the default 200ms threshold is reported as slow
//! let level = logger.trace(1, "orders", "find", Duration::from_millis(350), None);
//! assert_eq!(level, Some(LogLevel::Warn));
//! ```
//!
//! Logging is best-effort. Nothing in this module returns an error to the
//! operation that produced the event.

mod command;
mod context;
mod format;
mod handler;
mod pending;
mod record;
mod writer;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use command::{CommandLogger, CommandLoggerBuilder};
pub use context::{APP_ID, RequestMetadata, TRACE_ID, USER_ID};
pub use handler::{Dispatch, RecordHandler};
pub use pending::{PendingCommand, PendingCommands};
pub use record::{LOG_TYPE_MONGO, LogRecord, RESULT_SUCCESS};
pub use writer::{IoWriter, LogWriter, StdoutWriter, TracingWriter};

/// Severity threshold for command logging.
///
/// Levels are ordered: a logger configured at `Warn` reports errors and slow
/// commands but not normal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Nothing is logged.
    Silent = 1,
    /// Failed commands only.
    Error,
    /// Failed and slow commands.
    Warn,
    /// Every command.
    #[default]
    Info,
}

impl LogLevel {
    /// Get the level name as used in console lines and records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command logger settings.
///
/// Usually read from the `[logger]` table of the connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    /// Attach the command logger when installing a client.
    #[serde(default)]
    pub enabled: bool,

    /// Write rendered lines to standard output.
    #[serde(default = "default_true")]
    pub console: bool,

    /// Wrap console lines in ANSI colors.
    #[serde(default = "default_true")]
    pub colorful: bool,

    /// Successful commands slower than this are reported at `Warn`. Zero disables the check.
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,

    /// Most verbose level that is reported.
    #[serde(default)]
    pub level: LogLevel,

    /// How records reach the handler.
    #[serde(default)]
    pub dispatch: Dispatch,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            console: true,
            colorful: true,
            slow_threshold_ms: default_slow_threshold_ms(),
            level: LogLevel::Info,
            dispatch: Dispatch::Inline,
        }
    }
}

impl LoggerConfig {
    /// Slow threshold as a duration.
    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_slow_threshold_ms() -> u64 {
    200
}
