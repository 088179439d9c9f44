//! The command logger.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::context::RequestMetadata;
use super::format::ConsoleLine;
use super::handler::{RecordHandler, Sink};
use super::pending::{PendingCommand, PendingCommands};
use super::record::{LogRecord, RESULT_SUCCESS};
use super::writer::{LogWriter, StdoutWriter};
use super::{LogLevel, LoggerConfig};
use crate::monitor::{CommandObserver, FailedCommand, StartedCommand, SucceededCommand};

/// Classification of a finished command.
enum Outcome<'a> {
    Failed(&'a str),
    Slow(String),
    Success,
}

impl Outcome<'_> {
    fn level(&self) -> LogLevel {
        match self {
            Self::Failed(_) => LogLevel::Error,
            Self::Slow(_) => LogLevel::Warn,
            Self::Success => LogLevel::Info,
        }
    }

    fn message(&self) -> Option<&str> {
        match self {
            Self::Failed(failure) => Some(*failure),
            Self::Slow(notice) => Some(notice.as_str()),
            Self::Success => None,
        }
    }

    fn result(&self) -> &str {
        self.message().unwrap_or(RESULT_SUCCESS)
    }
}

/// Logs MongoDB commands as they complete.
///
/// The logger pairs started events with their terminal event by request id,
/// renders a console line through its [`LogWriter`] and hands a JSON
/// [`LogRecord`] to its [`RecordHandler`]. Either output is optional.
///
/// Each logger owns its pending-command store, so independently configured
/// loggers never see each other's commands.
pub struct CommandLogger {
    config: LoggerConfig,
    database: String,
    writer: Option<Arc<dyn LogWriter>>,
    sink: Option<Sink>,
    pending: PendingCommands,
}

impl CommandLogger {
    /// Create a logger from configuration alone.
    ///
    /// Lines go to standard output when `console` is set; there is no handler.
    pub fn new(config: LoggerConfig) -> Self {
        Self::builder(config).build()
    }

    /// Create a builder for a logger.
    pub fn builder(config: LoggerConfig) -> CommandLoggerBuilder {
        CommandLoggerBuilder::new(config)
    }

    /// Get the configuration.
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Commands that have started but not finished.
    pub fn pending(&self) -> &PendingCommands {
        &self.pending
    }

    /// Records dropped because the background queue was full.
    pub fn dropped_records(&self) -> u64 {
        self.sink.as_ref().map_or(0, Sink::dropped)
    }

    /// Classify a finished command and emit it.
    ///
    /// Returns the level the command was reported at, or `None` when the
    /// configured level suppressed it. An empty `failure` counts as success.
    pub fn trace(
        &self,
        request_id: i32,
        database: &str,
        statement: &str,
        elapsed: Duration,
        failure: Option<&str>,
    ) -> Option<LogLevel> {
        let outcome = self.classify(elapsed, failure.filter(|f| !f.is_empty()))?;
        let level = outcome.level();

        if let Some(writer) = &self.writer {
            let date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            let line = ConsoleLine {
                date: &date,
                level,
                database,
                request_id,
                elapsed,
                message: outcome.message(),
                statement,
            };
            writer.write_line(level, &line.render(self.config.colorful));
        }

        if let Some(sink) = &self.sink {
            let mut record = LogRecord::new(database, statement, outcome.result(), level, elapsed);
            RequestMetadata::map_current(|metadata| record.apply_metadata(metadata));

            match record.to_json() {
                Ok(payload) => sink.send(payload),
                Err(e) => debug!(error = %e, request_id, "Dropping command log record"),
            }
        }

        Some(level)
    }

    fn classify<'a>(&self, elapsed: Duration, failure: Option<&'a str>) -> Option<Outcome<'a>> {
        let level = self.config.level;
        if level <= LogLevel::Silent {
            return None;
        }

        let threshold = self.config.slow_threshold();
        match failure {
            Some(failure) if level >= LogLevel::Error => Some(Outcome::Failed(failure)),
            _ if !threshold.is_zero() && elapsed > threshold && level >= LogLevel::Warn => {
                Some(Outcome::Slow(format!("SLOW SQL >= {:?}", threshold)))
            }
            _ if level >= LogLevel::Info => Some(Outcome::Success),
            _ => None,
        }
    }

    fn finish(&self, request_id: i32, elapsed: Duration, failure: Option<&str>) {
        let PendingCommand {
            database,
            statement,
        } = match self.pending.take(request_id) {
            Some(pending) => pending,
            None => {
                debug!(request_id, "Command finished without a recorded start");
                PendingCommand {
                    database: self.database.clone(),
                    statement: String::new(),
                }
            }
        };

        self.trace(request_id, &database, &statement, elapsed, failure);
    }
}

impl CommandObserver for CommandLogger {
    fn on_start(&self, event: StartedCommand) {
        let replaced = self.pending.insert(
            event.request_id,
            PendingCommand {
                database: event.database,
                statement: event.command,
            },
        );
        if replaced.is_some() {
            debug!(request_id = event.request_id, "Command restarted before finishing");
        }
    }

    fn on_success(&self, event: SucceededCommand) {
        self.finish(event.request_id, event.duration, None);
    }

    fn on_failure(&self, event: FailedCommand) {
        self.finish(event.request_id, event.duration, Some(event.failure.as_str()));
    }
}

impl fmt::Debug for CommandLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLogger")
            .field("config", &self.config)
            .field("database", &self.database)
            .field("console", &self.writer.is_some())
            .field("handler", &self.sink.is_some())
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Builder for [`CommandLogger`].
pub struct CommandLoggerBuilder {
    config: LoggerConfig,
    database: String,
    writer: Option<Arc<dyn LogWriter>>,
    handler: Option<Arc<dyn RecordHandler>>,
}

impl CommandLoggerBuilder {
    /// Create a new builder.
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            database: String::new(),
            writer: None,
            handler: None,
        }
    }

    /// Database name reported for commands whose start was never seen.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Write console lines somewhere other than standard output.
    ///
    /// An explicit writer is used even when `console` is off.
    pub fn writer(mut self, writer: impl LogWriter + 'static) -> Self {
        self.writer = Some(Arc::new(writer));
        self
    }

    /// Set an already shared writer.
    pub fn shared_writer(mut self, writer: Arc<dyn LogWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Hand each record to a handler.
    pub fn handler(mut self, handler: impl RecordHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Set an already shared handler.
    pub fn shared_handler(mut self, handler: Arc<dyn RecordHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Build the logger.
    pub fn build(self) -> CommandLogger {
        let writer = self.writer.or_else(|| {
            self.config
                .console
                .then(|| Arc::new(StdoutWriter) as Arc<dyn LogWriter>)
        });
        let sink = self
            .handler
            .map(|handler| Sink::new(handler, self.config.dispatch));

        CommandLogger {
            config: self.config,
            database: self.database,
            writer,
            sink,
            pending: PendingCommands::new(),
        }
    }
}

impl fmt::Debug for CommandLoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLoggerBuilder")
            .field("config", &self.config)
            .field("database", &self.database)
            .field("writer", &self.writer.is_some())
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Lines(Mutex<Vec<(LogLevel, String)>>);

    impl LogWriter for Lines {
        fn write_line(&self, level: LogLevel, line: &str) {
            self.0.lock().push((level, line.to_string()));
        }
    }

    fn config(level: LogLevel) -> LoggerConfig {
        LoggerConfig {
            level,
            colorful: false,
            ..LoggerConfig::default()
        }
    }

    fn capture(level: LogLevel) -> (CommandLogger, Arc<Lines>, Arc<Mutex<Vec<LogRecord>>>) {
        let lines = Arc::new(Lines::default());
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = records.clone();
        let logger = CommandLogger::builder(config(level))
            .database("fallback")
            .shared_writer(lines.clone())
            .handler(move |payload: &[u8]| {
                sink.lock().push(serde_json::from_slice(payload).unwrap());
            })
            .build();
        (logger, lines, records)
    }

    #[test]
    fn test_silent_suppresses_everything() {
        let (logger, lines, records) = capture(LogLevel::Silent);

        assert_eq!(logger.trace(1, "db", "find", Duration::from_secs(5), Some("boom")), None);
        assert_eq!(logger.trace(2, "db", "find", Duration::ZERO, None), None);

        assert!(lines.0.lock().is_empty());
        assert!(records.lock().is_empty());
    }

    #[test]
    fn test_failure_wins_over_slow() {
        let (logger, lines, records) = capture(LogLevel::Info);

        let level = logger.trace(3, "db", "insert", Duration::from_secs(2), Some("duplicate key"));
        assert_eq!(level, Some(LogLevel::Error));

        let records = records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, "duplicate key");
        assert_eq!(records[0].level, LogLevel::Error);
        assert!(lines.0.lock()[0].1.contains("] duplicate key\ninsert"));
    }

    #[test]
    fn test_slow_requires_warn() {
        let (logger, _, records) = capture(LogLevel::Error);
        assert_eq!(logger.trace(1, "db", "find", Duration::from_secs(1), None), None);
        assert!(records.lock().is_empty());
    }

    #[test]
    fn test_zero_threshold_disables_slow() {
        let lines = Arc::new(Lines::default());
        let logger = CommandLogger::builder(LoggerConfig {
            slow_threshold_ms: 0,
            ..config(LogLevel::Info)
        })
        .shared_writer(lines.clone())
        .build();

        assert_eq!(
            logger.trace(1, "db", "find", Duration::from_secs(60), None),
            Some(LogLevel::Info)
        );
    }

    #[test]
    fn test_exactly_at_threshold_is_not_slow() {
        let (logger, _, _) = capture(LogLevel::Info);
        assert_eq!(
            logger.trace(1, "db", "find", Duration::from_millis(200), None),
            Some(LogLevel::Info)
        );
    }

    #[test]
    fn test_empty_failure_counts_as_success() {
        let (logger, _, records) = capture(LogLevel::Info);
        assert_eq!(
            logger.trace(1, "db", "find", Duration::ZERO, Some("")),
            Some(LogLevel::Info)
        );
        assert_eq!(records.lock()[0].result, RESULT_SUCCESS);
    }

    #[test]
    fn test_observer_pairs_start_and_finish() {
        let (logger, lines, records) = capture(LogLevel::Info);

        logger.on_start(StartedCommand::new(9, "orders", "find", "{ \"find\": \"orders\" }"));
        assert_eq!(logger.pending().len(), 1);
        logger.on_success(SucceededCommand::new(9, "find", Duration::from_millis(5)));

        assert!(logger.pending().is_empty());
        let records = records.lock();
        assert_eq!(records[0].database, "orders");
        assert_eq!(records[0].statement, "{ \"find\": \"orders\" }");
        assert!(lines.0.lock()[0].1.contains("[Database:orders] [RequestId:9]"));
    }

    #[test]
    fn test_missing_start_uses_fallback_database() {
        let (logger, _, records) = capture(LogLevel::Info);

        logger.on_failure(FailedCommand::new(4, "update", Duration::ZERO, "not primary"));

        let records = records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].database, "fallback");
        assert_eq!(records[0].statement, "");
        assert_eq!(records[0].result, "not primary");
    }

    #[test]
    fn test_console_off_without_writer() {
        let logger = CommandLogger::new(LoggerConfig {
            console: false,
            ..LoggerConfig::default()
        });
        assert!(logger.writer.is_none());
        assert!(logger.sink.is_none());
        assert_eq!(logger.dropped_records(), 0);
    }

    #[test]
    fn test_record_picks_up_request_metadata() {
        let (logger, _, records) = capture(LogLevel::Info);

        RequestMetadata::new()
            .insert("trace-id", "t-1")
            .insert("app-id", "billing")
            .sync_scope(|| logger.trace(1, "db", "find", Duration::ZERO, None));

        let records = records.lock();
        assert_eq!(records[0].trace_id.as_deref(), Some("t-1"));
        assert_eq!(records[0].invoke_app_id.as_deref(), Some("billing"));
        assert_eq!(records[0].account_id, None);
        assert!(records[0].path.contains("command.rs:"));
    }
}
