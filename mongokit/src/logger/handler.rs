//! Delivery of serialized records to a caller-supplied handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Receives each completed command as JSON bytes.
///
/// Any `Fn(&[u8]) + Send + Sync` closure is a handler.
pub trait RecordHandler: Send + Sync {
    /// Handle one serialized [`LogRecord`](super::LogRecord).
    fn handle(&self, payload: &[u8]);
}

impl<F> RecordHandler for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn handle(&self, payload: &[u8]) {
        self(payload)
    }
}

/// How records reach the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Dispatch {
    /// Call the handler on the thread that reported the command.
    #[default]
    Inline,
    /// Queue records for a background task.
    ///
    /// When the queue is full the record is dropped and counted; the command
    /// that produced it is never delayed.
    Background {
        /// Maximum number of queued records.
        capacity: usize,
    },
}

/// The handler as wired for a chosen dispatch mode.
pub(crate) enum Sink {
    Inline(Arc<dyn RecordHandler>),
    Background {
        tx: mpsc::Sender<Vec<u8>>,
        dropped: AtomicU64,
    },
}

impl Sink {
    /// Wire a handler.
    ///
    /// Background dispatch needs a tokio runtime to spawn its drain task.
    /// Without one the handler is called inline.
    pub(crate) fn new(handler: Arc<dyn RecordHandler>, dispatch: Dispatch) -> Self {
        let Dispatch::Background { capacity } = dispatch else {
            return Self::Inline(handler);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let (tx, mut rx) = mpsc::channel::<Vec<u8>>(capacity.max(1));
                runtime.spawn(async move {
                    while let Some(payload) = rx.recv().await {
                        handler.handle(&payload);
                    }
                });
                debug!(capacity, "Command log handler running in background");
                Self::Background {
                    tx,
                    dropped: AtomicU64::new(0),
                }
            }
            Err(_) => {
                warn!("No tokio runtime available, command log handler runs inline");
                Self::Inline(handler)
            }
        }
    }

    pub(crate) fn send(&self, payload: Vec<u8>) {
        match self {
            Self::Inline(handler) => handler.handle(&payload),
            Self::Background { tx, dropped } => match tx.try_send(payload) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(dropped = total, "Command log queue full, record dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            },
        }
    }

    pub(crate) fn dropped(&self) -> u64 {
        match self {
            Self::Inline(_) => 0,
            Self::Background { dropped, .. } => dropped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn is_background(&self) -> bool {
        matches!(self, Self::Background { .. })
    }
}
