//! Commands that have started but not yet finished.

use std::collections::HashMap;

use parking_lot::Mutex;

/// What is remembered about a command between its started and terminal events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Database the command ran against.
    pub database: String,
    /// Command text rendered when it started.
    pub statement: String,
}

/// Started commands keyed by driver request id.
///
/// The driver reports events from every in-flight operation concurrently, so
/// all access goes through a mutex. Each logger owns its own store.
#[derive(Debug, Default)]
pub struct PendingCommands {
    inner: Mutex<HashMap<i32, PendingCommand>>,
}

impl PendingCommands {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a started command, returning any entry it replaced.
    ///
    /// A second start for the same id replaces the first.
    pub fn insert(&self, request_id: i32, command: PendingCommand) -> Option<PendingCommand> {
        self.inner.lock().insert(request_id, command)
    }

    /// Remove and return the entry for a request id.
    pub fn take(&self, request_id: i32) -> Option<PendingCommand> {
        self.inner.lock().remove(&request_id)
    }

    /// Number of commands waiting for a terminal event.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if no command is waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(statement: &str) -> PendingCommand {
        PendingCommand {
            database: "orders".to_string(),
            statement: statement.to_string(),
        }
    }

    #[test]
    fn test_take_removes_entry() {
        let pending = PendingCommands::new();
        pending.insert(1, command("find"));
        assert_eq!(pending.len(), 1);

        assert_eq!(pending.take(1), Some(command("find")));
        assert!(pending.is_empty());
        assert_eq!(pending.take(1), None);
    }

    #[test]
    fn test_last_start_wins() {
        let pending = PendingCommands::new();
        assert!(pending.insert(7, command("find")).is_none());
        assert_eq!(pending.insert(7, command("count")), Some(command("find")));
        assert_eq!(pending.take(7).unwrap().statement, "count");
    }

    #[test]
    fn test_concurrent_insert_and_take() {
        let pending = std::sync::Arc::new(PendingCommands::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pending = pending.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let id = t * 1000 + i;
                        pending.insert(id, command("find"));
                        assert!(pending.take(id).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pending.is_empty());
    }
}
