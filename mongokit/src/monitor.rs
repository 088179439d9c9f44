//! Bridge between the driver's command events and a command observer.
//!
//! The driver calls its command event handler synchronously on the task
//! running each operation. [`CommandMonitor`] is that handler: it converts
//! each driver event into an owned, constructible event type and passes it
//! to a [`CommandObserver`] such as the
//! [`CommandLogger`](crate::logger::CommandLogger).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bson::Document;
use mongodb::event::command::{
    CommandEventHandler, CommandFailedEvent, CommandStartedEvent, CommandSucceededEvent,
};

/// A command was sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedCommand {
    /// Driver-assigned correlation id.
    pub request_id: i32,
    /// Database the command targets.
    pub database: String,
    /// Command name, e.g. `find`.
    pub command_name: String,
    /// Rendered command document.
    pub command: String,
}

impl StartedCommand {
    /// Create a started event.
    pub fn new(
        request_id: i32,
        database: impl Into<String>,
        command_name: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            database: database.into(),
            command_name: command_name.into(),
            command: command.into(),
        }
    }
}

impl From<CommandStartedEvent> for StartedCommand {
    fn from(event: CommandStartedEvent) -> Self {
        Self {
            request_id: event.request_id,
            command: event.command.to_string(),
            database: event.db,
            command_name: event.command_name,
        }
    }
}

/// The server replied successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct SucceededCommand {
    /// Driver-assigned correlation id.
    pub request_id: i32,
    /// Command name, e.g. `find`.
    pub command_name: String,
    /// Round-trip time.
    pub duration: Duration,
    /// Server reply.
    pub reply: Document,
}

impl SucceededCommand {
    /// Create a succeeded event with an empty reply.
    pub fn new(request_id: i32, command_name: impl Into<String>, duration: Duration) -> Self {
        Self {
            request_id,
            command_name: command_name.into(),
            duration,
            reply: Document::new(),
        }
    }
}

impl From<CommandSucceededEvent> for SucceededCommand {
    fn from(event: CommandSucceededEvent) -> Self {
        Self {
            request_id: event.request_id,
            command_name: event.command_name,
            duration: event.duration,
            reply: event.reply,
        }
    }
}

/// The command failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedCommand {
    /// Driver-assigned correlation id.
    pub request_id: i32,
    /// Command name, e.g. `find`.
    pub command_name: String,
    /// Time until the failure was observed.
    pub duration: Duration,
    /// Rendered failure.
    pub failure: String,
}

impl FailedCommand {
    /// Create a failed event.
    pub fn new(
        request_id: i32,
        command_name: impl Into<String>,
        duration: Duration,
        failure: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            command_name: command_name.into(),
            duration,
            failure: failure.into(),
        }
    }
}

impl From<CommandFailedEvent> for FailedCommand {
    fn from(event: CommandFailedEvent) -> Self {
        Self {
            request_id: event.request_id,
            failure: event.failure.to_string(),
            command_name: event.command_name,
            duration: event.duration,
        }
    }
}

/// Receives command lifecycle events.
///
/// Methods are called synchronously from the driver, concurrently across
/// in-flight commands and in no guaranteed order across request ids. A
/// terminal event may arrive with no started event before it.
pub trait CommandObserver: Send + Sync {
    /// A command was sent.
    fn on_start(&self, event: StartedCommand);

    /// A command succeeded.
    fn on_success(&self, event: SucceededCommand);

    /// A command failed.
    fn on_failure(&self, event: FailedCommand);
}

/// The driver-facing command event handler.
#[derive(Clone)]
pub struct CommandMonitor {
    observer: Arc<dyn CommandObserver>,
}

impl CommandMonitor {
    /// Wrap an observer.
    pub fn new<O: CommandObserver + 'static>(observer: Arc<O>) -> Self {
        Self { observer }
    }

    /// Wrap an already type-erased observer.
    pub fn from_dyn(observer: Arc<dyn CommandObserver>) -> Self {
        Self { observer }
    }
}

impl CommandEventHandler for CommandMonitor {
    fn handle_command_started_event(&self, event: CommandStartedEvent) {
        self.observer.on_start(event.into());
    }

    fn handle_command_succeeded_event(&self, event: CommandSucceededEvent) {
        self.observer.on_success(event.into());
    }

    fn handle_command_failed_event(&self, event: CommandFailedEvent) {
        self.observer.on_failure(event.into());
    }
}

impl fmt::Debug for CommandMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMonitor").finish_non_exhaustive()
    }
}
