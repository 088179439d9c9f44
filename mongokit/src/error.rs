//! Error types for connection setup and collection helpers.
//!
//! Command logging never produces these: every fault inside the logger is
//! absorbed so the database call path is unaffected.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for mongokit operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Errors that can occur while installing a client or running a helper.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// A file referenced by the configuration could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TLS material was present but unusable.
    #[error("invalid tls material in {}: {message}", path.display())]
    Tls {
        /// File the bad material came from.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// Invalid ObjectId.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// Setup did not finish within the allotted time.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
}

impl MongoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error for the given file.
    pub fn tls(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Tls {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error for the given file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid object id error.
    pub fn invalid_object_id(message: impl Into<String>) -> Self {
        Self::InvalidObjectId(message.into())
    }

    /// Check if this is a connection error.
    ///
    /// Driver errors raised while connecting or pinging count as connection errors.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Driver(_))
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this error came from loading TLS material.
    pub fn is_tls_error(&self) -> bool {
        matches!(self, Self::Tls { .. } | Self::Io { .. })
    }
}

impl From<bson::oid::Error> for MongoError {
    fn from(err: bson::oid::Error) -> Self {
        MongoError::InvalidObjectId(err.to_string())
    }
}
