//! Console line rendering.

use std::fmt::Write;
use std::time::Duration;

use owo_colors::OwoColorize;

use super::LogLevel;

/// Everything that goes into one console line.
#[derive(Debug)]
pub(crate) struct ConsoleLine<'a> {
    pub date: &'a str,
    pub level: LogLevel,
    pub database: &'a str,
    pub request_id: i32,
    pub elapsed: Duration,
    /// Failure or slow-command notice; `None` for normal commands.
    pub message: Option<&'a str>,
    pub statement: &'a str,
}

impl ConsoleLine<'_> {
    /// Render the line, with ANSI colors when `colorful` is set.
    ///
    /// `[date] [level] [Database:db] [RequestId:id] [Duration:1.234ms] message`
    /// followed by the statement on its own line.
    pub fn render(&self, colorful: bool) -> String {
        let mut line = String::with_capacity(96 + self.statement.len());
        let _ = write!(line, "[{}] [{}] ", self.date, self.level);

        let database = format!("[Database:{}] ", self.database);
        let request = format!("[RequestId:{}] ", self.request_id);
        let duration = format!("[Duration:{:.3}ms]", millis(self.elapsed));

        if colorful {
            let _ = write!(
                line,
                "{}{}{}",
                database.blue().bold(),
                request.blue().bold(),
                duration.yellow()
            );
            if let Some(message) = self.message {
                match self.level {
                    LogLevel::Error => {
                        let _ = write!(line, " {}", message.red().bold());
                    }
                    _ => {
                        let _ = write!(line, " {}", message.yellow());
                    }
                }
            }
        } else {
            line.push_str(&database);
            line.push_str(&request);
            line.push_str(&duration);
            if let Some(message) = self.message {
                line.push(' ');
                line.push_str(message);
            }
        }

        line.push('\n');
        line.push_str(self.statement);
        line
    }
}

/// Elapsed time as fractional milliseconds.
pub(crate) fn millis(elapsed: Duration) -> f64 {
    elapsed.as_nanos() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(level: LogLevel, message: Option<&'static str>) -> ConsoleLine<'static> {
        ConsoleLine {
            date: "2024-05-01 10:00:00",
            level,
            database: "orders",
            request_id: 12,
            elapsed: Duration::from_nanos(50_123_456),
            message,
            statement: "{ \"find\": \"orders\" }",
        }
    }

    #[test]
    fn test_plain_info_line() {
        assert_eq!(
            line(LogLevel::Info, None).render(false),
            "[2024-05-01 10:00:00] [info] [Database:orders] [RequestId:12] [Duration:50.123ms]\n{ \"find\": \"orders\" }"
        );
    }

    #[test]
    fn test_plain_error_line_carries_message() {
        let rendered = line(LogLevel::Error, Some("duplicate key")).render(false);
        assert!(rendered.starts_with("[2024-05-01 10:00:00] [error] "));
        assert!(rendered.contains("[Duration:50.123ms] duplicate key\n"));
        assert!(!rendered.contains('\u{1b}'));
    }

    #[test]
    fn test_colorful_line_has_same_text() {
        let colored = line(LogLevel::Warn, Some("SLOW SQL >= 200ms")).render(true);
        assert!(colored.contains('\u{1b}'));

        let stripped = strip_ansi(&colored);
        assert_eq!(stripped, line(LogLevel::Warn, Some("SLOW SQL >= 200ms")).render(false));
    }

    #[test]
    fn test_millis_precision() {
        assert_eq!(format!("{:.3}", millis(Duration::from_micros(1500))), "1.500");
        assert_eq!(format!("{:.3}", millis(Duration::ZERO)), "0.000");
    }

    fn strip_ansi(s: &str) -> String {
        let re = regex_lite::Regex::new("\u{1b}\\[[0-9;]*m").unwrap();
        re.replace_all(s, "").into_owned()
    }
}
