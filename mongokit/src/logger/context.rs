//! Request-scoped metadata picked up by command records.
//!
//! Driver events carry no request context of their own. Callers that want
//! their records correlated run the database work inside
//! [`RequestMetadata::scope`], and the logger reads the metadata back from the
//! current task when the terminal event arrives.
//!
//! ```rust,ignore
//! use mongokit::logger::RequestMetadata;
//!
//! let orders = RequestMetadata::new()
//!     .insert("trace-id", trace_id)
//!     .scope(async { collection.find_one(filter, None).await })
//!     .await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::panic::Location;

/// Metadata key holding the request trace id.
pub const TRACE_ID: &str = "trace-id";
/// Metadata key holding the calling user or account.
pub const USER_ID: &str = "user-id";
/// Metadata key holding the invoking application.
pub const APP_ID: &str = "app-id";

tokio::task_local! {
    static REQUEST_METADATA: RequestMetadata;
}

/// Key/value metadata for the request a command belongs to.
///
/// Keys are case-insensitive and stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    entries: HashMap<String, String>,
    location: Option<String>,
}

impl RequestMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key/value pair.
    pub fn insert(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.entries
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the caller location reported as the record path.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `trace-id` value.
    pub fn trace_id(&self) -> Option<&str> {
        self.get(TRACE_ID)
    }

    /// The `user-id` value.
    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID)
    }

    /// The `app-id` value.
    pub fn app_id(&self) -> Option<&str> {
        self.get(APP_ID)
    }

    /// Caller location, as `file:line`.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Run a future with this metadata as the current request.
    ///
    /// The location of the call to `scope` becomes the record path unless one
    /// was set explicitly.
    #[track_caller]
    pub fn scope<F: Future>(mut self, fut: F) -> impl Future<Output = F::Output> {
        self.fill_location(Location::caller());
        REQUEST_METADATA.scope(self, fut)
    }

    /// Run a closure with this metadata as the current request.
    #[track_caller]
    pub fn sync_scope<R>(mut self, f: impl FnOnce() -> R) -> R {
        self.fill_location(Location::caller());
        REQUEST_METADATA.sync_scope(self, f)
    }

    /// Call `f` with the metadata of the current request.
    ///
    /// Returns `None` when no request scope is active.
    pub fn map_current<R>(f: impl FnOnce(&RequestMetadata) -> R) -> Option<R> {
        REQUEST_METADATA.try_with(f).ok()
    }

    /// Clone the metadata of the current request, if any.
    pub fn current() -> Option<RequestMetadata> {
        REQUEST_METADATA.try_with(Clone::clone).ok()
    }

    fn fill_location(&mut self, caller: &Location<'_>) {
        if self.location.is_none() {
            self.location = Some(format!("{}:{}", caller.file(), caller.line()));
        }
    }
}
