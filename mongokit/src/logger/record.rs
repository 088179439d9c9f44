//! Structured command log record.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::LogLevel;
use super::context::RequestMetadata;

/// Emission type tag carried by every record.
pub const LOG_TYPE_MONGO: &str = "mongo";

/// Result text of a command that finished normally.
pub const RESULT_SUCCESS: &str = "success";

/// One completed command, as handed to a [`RecordHandler`](super::RecordHandler).
///
/// Serialized as JSON with the field names consumers already expect
/// (`Statement`, `Result`, ...). Correlation ids are only present when the
/// command ran inside a [`RequestMetadata`] scope that carried them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogRecord {
    /// Database the command ran against.
    pub database: String,
    /// Command text, empty when the started event was never seen.
    pub statement: String,
    /// Failure message, slow-command notice, or `"success"`.
    pub result: String,
    /// Severity the command was reported at.
    pub level: LogLevel,
    /// Elapsed time in whole milliseconds.
    pub duration: u64,
    /// Emission type tag.
    #[serde(rename = "Type")]
    pub kind: String,
    /// Caller location, empty when unknown.
    pub path: String,
    /// Request trace id.
    #[serde(rename = "trace_id", default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Calling account (the `user-id` metadata key).
    #[serde(rename = "account_id", default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Invoking application.
    #[serde(rename = "invoke_app_id", default, skip_serializing_if = "Option::is_none")]
    pub invoke_app_id: Option<String>,
}

impl LogRecord {
    /// Create a record without correlation ids.
    pub fn new(
        database: impl Into<String>,
        statement: impl Into<String>,
        result: impl Into<String>,
        level: LogLevel,
        elapsed: Duration,
    ) -> Self {
        Self {
            database: database.into(),
            statement: statement.into(),
            result: result.into(),
            level,
            duration: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            kind: LOG_TYPE_MONGO.to_string(),
            path: String::new(),
            trace_id: None,
            account_id: None,
            invoke_app_id: None,
        }
    }

    /// Copy correlation ids and caller location from request metadata.
    pub fn apply_metadata(&mut self, metadata: &RequestMetadata) {
        self.trace_id = metadata.trace_id().map(str::to_string);
        self.account_id = metadata.user_id().map(str::to_string);
        self.invoke_app_id = metadata.app_id().map(str::to_string);
        if let Some(location) = metadata.location() {
            self.path = location.to_string();
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
