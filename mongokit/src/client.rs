//! Connection installer.
//!
//! [`MongoClient::install`] turns a [`MongoConfig`] into a connected, pinged
//! database handle. Credentials and TLS are applied only when fully
//! configured, the command logger is attached before the first connection,
//! and the whole setup runs under a fixed timeout.

use std::sync::Arc;
use std::time::Duration;

use bson::{Document, doc};
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult};
use crate::logger::{CommandLogger, LogWriter, RecordHandler};
use crate::monitor::CommandMonitor;
use crate::tls::TlsMaterial;

/// Upper bound on connecting and pinging the primary.
pub const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A connected MongoDB handle.
///
/// The driver pools connections internally; clones share the pool, the
/// command logger and the TLS bundle.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
    logger: Option<Arc<CommandLogger>>,
    _tls: Option<Arc<TlsMaterial>>,
}

impl MongoClient {
    /// Connect with the default console logger and no record handler.
    pub async fn install(config: MongoConfig) -> MongoResult<Self> {
        Self::builder(config).install().await
    }

    /// Create a builder for customizing logger output.
    pub fn builder(config: MongoConfig) -> MongoClientBuilder {
        MongoClientBuilder::new(config)
    }

    /// Get a typed collection.
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.database.collection(name)
    }

    /// Get a collection with BSON documents.
    pub fn collection_doc(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// Get the configured database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the underlying MongoDB client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// The command logger, when logging is enabled.
    pub fn logger(&self) -> Option<&Arc<CommandLogger>> {
        self.logger.as_ref()
    }

    /// Check if the client is healthy by pinging the server.
    pub async fn is_healthy(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }
}

impl std::fmt::Debug for MongoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoClient")
            .field("address", &self.config.address)
            .field("database", &self.config.database)
            .field("logger", &self.logger.is_some())
            .field("tls", &self._tls.is_some())
            .finish()
    }
}

/// Builder for [`MongoClient`].
pub struct MongoClientBuilder {
    config: MongoConfig,
    writer: Option<Arc<dyn LogWriter>>,
    handler: Option<Arc<dyn RecordHandler>>,
    setup_timeout: Duration,
}

impl MongoClientBuilder {
    /// Create a new builder.
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            writer: None,
            handler: None,
            setup_timeout: SETUP_TIMEOUT,
        }
    }

    /// Hand each command record to a handler.
    pub fn handler(mut self, handler: impl RecordHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Write console lines somewhere other than standard output.
    pub fn writer(mut self, writer: impl LogWriter + 'static) -> Self {
        self.writer = Some(Arc::new(writer));
        self
    }

    /// Override the setup timeout.
    pub fn setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    /// The logger this builder would attach, or `None` when logging is off.
    pub fn command_logger(&self) -> Option<CommandLogger> {
        if !self.config.logger.enabled {
            return None;
        }

        let mut builder = CommandLogger::builder(self.config.logger.clone())
            .database(self.config.database.clone());
        if let Some(writer) = &self.writer {
            builder = builder.shared_writer(writer.clone());
        }
        if let Some(handler) = &self.handler {
            builder = builder.shared_handler(handler.clone());
        }
        Some(builder.build())
    }

    /// Connect, ping the primary and return the handle.
    pub async fn install(self) -> MongoResult<MongoClient> {
        if self.config.database.is_empty() {
            return Err(MongoError::config("database name is required"));
        }

        let timeout = self.setup_timeout;
        match tokio::time::timeout(timeout, self.connect()).await {
            Ok(result) => result,
            Err(_) => Err(timed_out(timeout)),
        }
    }

    async fn connect(self) -> MongoResult<MongoClient> {
        let mut options = self.config.to_client_options().await?;

        let tls = match self.config.tls_config() {
            Some(paths) => {
                let material = TlsMaterial::load(paths)?;
                options.tls = Some(material.to_tls());
                Some(Arc::new(material))
            }
            None => None,
        };

        let logger = self.command_logger().map(Arc::new);
        if let Some(logger) = &logger {
            options.command_event_handler = Some(Arc::new(CommandMonitor::new(logger.clone())));
            debug!(level = %logger.config().level, "Command logger attached");
        }

        let client = connect_and_ping(options).await?;
        let database = client.database(&self.config.database);

        info!(
            address = %self.config.address,
            database = %self.config.database,
            tls = tls.is_some(),
            "MongoDB client installed"
        );

        Ok(MongoClient {
            client,
            database,
            config: Arc::new(self.config),
            logger,
            _tls: tls,
        })
    }
}

fn timed_out(timeout: Duration) -> MongoError {
    MongoError::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
}

async fn connect_and_ping(options: ClientOptions) -> MongoResult<Client> {
    let client = Client::with_options(options)
        .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;

    let primary = SelectionCriteria::ReadPreference(ReadPreference::Primary);
    client
        .database("admin")
        .run_command(doc! { "ping": 1 }, primary)
        .await
        .map_err(|e| MongoError::connection(format!("ping failed: {}", e)))?;

    Ok(client)
}

impl std::fmt::Debug for MongoClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoClientBuilder")
            .field("config", &self.config)
            .field("writer", &self.writer.is_some())
            .field("handler", &self.handler.is_some())
            .field("setup_timeout", &self.setup_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use crate::logger::LogLevel;

    fn config() -> MongoConfig {
        MongoConfig::new("localhost:27017", "orders")
    }

    #[test]
    fn test_builder_defaults() {
        let builder = MongoClient::builder(config());
        assert_eq!(builder.setup_timeout, SETUP_TIMEOUT);
        assert!(builder.handler.is_none());
    }

    #[test]
    fn test_no_logger_when_disabled() {
        let builder = MongoClient::builder(config()).handler(|_: &[u8]| {});
        assert!(builder.command_logger().is_none());
    }

    #[test]
    fn test_logger_uses_config() {
        let mut config = config();
        config.logger.enabled = true;
        config.logger.level = LogLevel::Warn;
        config.logger.console = false;

        let logger = MongoClient::builder(config)
            .command_logger()
            .unwrap();
        assert_eq!(logger.config().level, LogLevel::Warn);
        assert!(logger.pending().is_empty());
    }

    #[tokio::test]
    async fn test_setup_timeout_reports_millis() {
        // Nothing listens on the discard port, so the ping cannot finish in time.
        let err = MongoClient::builder(MongoConfig::new("127.0.0.1:9", "orders"))
            .setup_timeout(Duration::from_millis(50))
            .install()
            .await
            .unwrap_err();
        assert!(matches!(err, MongoError::Timeout(50)), "{err:?}");
    }

    #[test]
    fn test_timeout_millis_saturate() {
        assert!(matches!(timed_out(SETUP_TIMEOUT), MongoError::Timeout(10_000)));
        assert!(matches!(timed_out(Duration::MAX), MongoError::Timeout(u64::MAX)));
    }

    #[tokio::test]
    async fn test_install_rejects_empty_database() {
        let err = MongoClient::install(MongoConfig::default()).await.unwrap_err();
        assert!(matches!(err, MongoError::Config(_)));
    }

    #[tokio::test]
    async fn test_bad_tls_material_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.tls = Some(TlsConfig {
            ca_cert: dir.path().join("missing-ca.pem").display().to_string(),
            client_cert: dir.path().join("client.pem").display().to_string(),
            client_cert_key: dir.path().join("client.key").display().to_string(),
        });

        let err = MongoClient::install(config).await.unwrap_err();
        assert!(err.is_tls_error(), "{err:?}");
    }
}
