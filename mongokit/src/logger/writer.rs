//! Destinations for rendered console lines.
//!
//! Writers run inside the driver's event callback, so a failed write is
//! dropped with a `debug!` event and never surfaces as an error or a panic.

use std::io::{self, Write};

use parking_lot::Mutex;
use tracing::debug;

use super::LogLevel;

/// Target for tracing events emitted by [`TracingWriter`].
pub const COMMAND_TARGET: &str = "mongokit::command";

/// Receives rendered command lines.
pub trait LogWriter: Send + Sync {
    /// Write one rendered line at the given level.
    fn write_line(&self, level: LogLevel, line: &str);
}

/// Writes lines to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutWriter;

impl LogWriter for StdoutWriter {
    fn write_line(&self, _level: LogLevel, line: &str) {
        emit(&mut io::stdout().lock(), line);
    }
}

/// Writes lines to any [`io::Write`], such as a file or a socket.
#[derive(Debug, Default)]
pub struct IoWriter<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> IoWriter<W> {
    /// Wrap a sink.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> LogWriter for IoWriter<W> {
    fn write_line(&self, _level: LogLevel, line: &str) {
        emit(&mut *self.out.lock(), line);
    }
}

/// Forwards lines to `tracing` under the `mongokit::command` target.
///
/// Useful when the application already ships its `tracing` output somewhere;
/// pair it with `colorful = false` so the events carry no escape codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWriter;

impl LogWriter for TracingWriter {
    fn write_line(&self, level: LogLevel, line: &str) {
        match level {
            LogLevel::Error => tracing::error!(target: COMMAND_TARGET, "{}", line),
            LogLevel::Warn => tracing::warn!(target: COMMAND_TARGET, "{}", line),
            LogLevel::Info => tracing::info!(target: COMMAND_TARGET, "{}", line),
            LogLevel::Silent => {}
        }
    }
}

impl<W: LogWriter + ?Sized> LogWriter for std::sync::Arc<W> {
    fn write_line(&self, level: LogLevel, line: &str) {
        (**self).write_line(level, line);
    }
}

fn emit(out: &mut impl Write, line: &str) {
    if let Err(e) = writeln!(out, "{}", line).and_then(|()| out.flush()) {
        debug!(error = %e, "Dropping command log line");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A sink whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_io_writer_appends_lines() {
        let writer = IoWriter::new(Vec::new());
        writer.write_line(LogLevel::Info, "first");
        writer.write_line(LogLevel::Warn, "second\nstatement");

        let written = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(written, "first\nsecond\nstatement\n");
    }

    #[test]
    fn test_failed_write_is_dropped() {
        let writer = IoWriter::new(ClosedPipe);
        writer.write_line(LogLevel::Error, "lost");
        writer.write_line(LogLevel::Info, "also lost");
    }
}
