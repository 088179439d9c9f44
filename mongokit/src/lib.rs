//! # mongokit
//!
//! Convenience layer over the official MongoDB driver.
//!
//! This crate provides:
//! - A connection installer that applies credentials, TLS and pool limits,
//!   then connects and pings the primary under a fixed timeout
//! - A command logger that pairs driver command events by request id,
//!   classifies them as failed, slow or normal and emits console lines and
//!   JSON records
//! - Hard and soft delete helpers keyed by hex ids
//! - Page-number pagination with size clamping
//! - Filter building with id, time range and soft-delete helpers
//!
//! ## Example
//!
//! ```rust,no_run
//! use mongokit::{MongoClient, MongoConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = MongoConfig::new("localhost:27017", "orders");
//!     config.logger.enabled = true;
//!
//!     let client = MongoClient::builder(config)
//!         .handler(|record: &[u8]| {
//!             // ship the JSON record somewhere
//!             let _ = record;
//!         })
//!         .install()
//!         .await?;
//!
//!     let orders = client.collection_doc("orders");
//!     mongokit::delete::soft_delete(&orders, "65a1f0c2e4b0a1b2c3d4e5f6").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod delete;
pub mod document;
pub mod error;
pub mod filter;
pub mod logger;
pub mod logging;
pub mod monitor;
pub mod pagination;
pub mod tls;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use client::{MongoClient, MongoClientBuilder, SETUP_TIMEOUT};
pub use config::{MongoConfig, MongoConfigBuilder, TlsConfig};
pub use document::{Table, object_ids_from_hex, parse_object_id};
pub use error::{MongoError, MongoResult};
pub use filter::FilterBuilder;
pub use logger::{
    CommandLogger, CommandLoggerBuilder, Dispatch, LogLevel, LogRecord, LogWriter, LoggerConfig,
    RecordHandler, RequestMetadata,
};
pub use monitor::{CommandMonitor, CommandObserver};
pub use pagination::Paging;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder};
    pub use crate::delete::{delete, delete_many, soft_delete, soft_delete_many};
    pub use crate::document::Table;
    pub use crate::error::{MongoError, MongoResult};
    pub use crate::filter::FilterBuilder;
    pub use crate::logger::{CommandLogger, LogLevel, LoggerConfig, RequestMetadata};
    pub use crate::pagination::Paging;
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
