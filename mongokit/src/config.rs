//! MongoDB connection configuration.
//!
//! Configuration is usually loaded from a TOML file:
//!
//! ```toml
//! address = "db-1:27017,db-2:27017"
//! database = "orders"
//! username = "svc"
//! password = "${MONGO_PASSWORD}"
//! max_open_connects = 10
//! max_idle_connects = 100
//! conn_max_life_time = 300
//!
//! [tls]
//! ca_cert = "/etc/mongo/ca.pem"
//! client_cert = "/etc/mongo/client.pem"
//! client_cert_key = "/etc/mongo/client.key"
//!
//! [logger]
//! enabled = true
//! slow_threshold_ms = 200
//! level = "info"
//! ```
//!
//! `${VAR}` references are replaced with environment variables before parsing.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use mongodb::options::{ClientOptions, Credential};
use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{MongoError, MongoResult};
use crate::logger::LoggerConfig;

/// MongoDB connection configuration.
///
/// Pool settings of 0 mean "no limit": the driver default is kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MongoConfig {
    /// Host list, `host:port[,host:port...]`, without the scheme.
    #[serde(default = "default_address")]
    pub address: String,

    /// Database the installed handle points at.
    #[serde(default)]
    pub database: String,

    /// Username; credentials are applied only when both parts are set.
    #[serde(default)]
    pub username: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Application name (shown in server logs).
    #[serde(default)]
    pub app_name: Option<String>,

    /// Client TLS material.
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Connections that may be establishing at once (driver `max_connecting`).
    #[serde(default)]
    pub max_open_connects: u32,

    /// Connections the pool may hold (driver `max_pool_size`).
    #[serde(default)]
    pub max_idle_connects: u32,

    /// Seconds a pooled connection may sit idle before it is closed (driver `max_idle_time`).
    #[serde(default)]
    pub conn_max_life_time: u64,

    /// Command logger settings.
    #[serde(default)]
    pub logger: LoggerConfig,
}

/// Paths of the client TLS files.
///
/// TLS is enabled only when all three are non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TlsConfig {
    /// CA certificate bundle.
    #[serde(default)]
    pub ca_cert: String,
    /// Client certificate.
    #[serde(default)]
    pub client_cert: String,
    /// Client private key.
    #[serde(default)]
    pub client_cert_key: String,
}

impl TlsConfig {
    /// Check if every path is set.
    pub fn is_complete(&self) -> bool {
        !self.ca_cert.is_empty() && !self.client_cert.is_empty() && !self.client_cert_key.is_empty()
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            app_name: None,
            tls: None,
            max_open_connects: 0,
            max_idle_connects: 0,
            conn_max_life_time: 0,
            logger: LoggerConfig::default(),
        }
    }
}

fn default_address() -> String {
    "localhost:27017".to_string()
}

impl MongoConfig {
    /// Create a configuration for an address and database.
    pub fn new(address: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> MongoResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MongoError::io(path, e))?;
        content.parse()
    }

    /// Connection URI built from the address.
    pub fn uri(&self) -> String {
        format!("mongodb://{}", self.address)
    }

    /// Driver credential, when both username and password are set.
    pub fn credential(&self) -> Option<Credential> {
        if self.username.is_empty() || self.password.is_empty() {
            return None;
        }
        Some(
            Credential::builder()
                .username(self.username.clone())
                .password(self.password.clone())
                .build(),
        )
    }

    /// TLS paths, when all three are set.
    pub fn tls_config(&self) -> Option<&TlsConfig> {
        self.tls.as_ref().filter(|tls| tls.is_complete())
    }

    /// Convert to MongoDB ClientOptions.
    ///
    /// TLS and the command monitor are attached by the installer, not here.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(self.uri())
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(credential) = self.credential() {
            options.credential = Some(credential);
        }

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }

        options.max_connecting = non_zero(self.max_open_connects);
        options.max_pool_size = non_zero(self.max_idle_connects);
        options.max_idle_time =
            non_zero(self.conn_max_life_time).map(Duration::from_secs);

        Ok(options)
    }
}

fn non_zero<T: Default + PartialEq>(value: T) -> Option<T> {
    (value != T::default()).then_some(value)
}

impl FromStr for MongoConfig {
    type Err = MongoError;

    /// Parse configuration from a TOML string.
    fn from_str(content: &str) -> MongoResult<Self> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }
}

/// Builder for MongoDB configuration.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    address: Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    app_name: Option<String>,
    tls: Option<TlsConfig>,
    max_open_connects: Option<u32>,
    max_idle_connects: Option<u32>,
    conn_max_life_time: Option<Duration>,
    logger: Option<LoggerConfig>,
}

impl MongoConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host list.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set username and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the CA, client certificate and client key paths.
    pub fn tls(
        mut self,
        ca_cert: impl Into<String>,
        client_cert: impl Into<String>,
        client_cert_key: impl Into<String>,
    ) -> Self {
        self.tls = Some(TlsConfig {
            ca_cert: ca_cert.into(),
            client_cert: client_cert.into(),
            client_cert_key: client_cert_key.into(),
        });
        self
    }

    /// Set how many connections may be establishing at once.
    pub fn max_open_connects(mut self, size: u32) -> Self {
        self.max_open_connects = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_idle_connects(mut self, size: u32) -> Self {
        self.max_idle_connects = Some(size);
        self
    }

    /// Set how long a pooled connection may sit idle. Whole seconds are kept.
    pub fn conn_max_life_time(mut self, duration: Duration) -> Self {
        self.conn_max_life_time = Some(duration);
        self
    }

    /// Set the command logger settings.
    pub fn logger(mut self, logger: LoggerConfig) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoResult<MongoConfig> {
        let database = self
            .database
            .filter(|d| !d.is_empty())
            .ok_or_else(|| MongoError::config("database name is required"))?;

        Ok(MongoConfig {
            address: self.address.unwrap_or_else(default_address),
            database,
            username: self.username.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            app_name: self.app_name,
            tls: self.tls,
            max_open_connects: self.max_open_connects.unwrap_or_default(),
            max_idle_connects: self.max_idle_connects.unwrap_or_default(),
            conn_max_life_time: self
                .conn_max_life_time
                .map_or(0, |d| d.as_secs()),
            logger: self.logger.unwrap_or_default(),
        })
    }
}

/// Replace `${VAR}` with the value of environment variable `VAR`.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    let re = match Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };

    re.replace_all(content, |caps: &Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_new() {
        let config = MongoConfig::new("db-1:27017", "orders");
        assert_eq!(config.uri(), "mongodb://db-1:27017");
        assert_eq!(config.database, "orders");
        assert!(!config.logger.enabled);
    }

    #[test]
    fn test_config_builder() {
        let config = MongoConfig::builder()
            .address("db-1:27017")
            .database("orders")
            .credentials("svc", "secret")
            .max_open_connects(50)
            .max_idle_connects(5)
            .conn_max_life_time(Duration::from_secs(300))
            .build()
            .unwrap();

        assert_eq!(config.username, "svc");
        assert_eq!(config.max_open_connects, 50);
        assert_eq!(config.max_idle_connects, 5);
        assert_eq!(config.conn_max_life_time, 300);
    }

    #[test]
    fn test_config_builder_missing_database() {
        let result = MongoConfig::builder().address("localhost:27017").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let mut config = MongoConfig::new("localhost:27017", "orders");
        config.username = "svc".to_string();
        assert!(config.credential().is_none());

        config.password = "secret".to_string();
        let credential = config.credential().unwrap();
        assert_eq!(credential.username.as_deref(), Some("svc"));
    }

    #[test]
    fn test_partial_tls_is_ignored() {
        let config = MongoConfig::builder()
            .database("orders")
            .tls("ca.pem", "client.pem", "")
            .build()
            .unwrap();
        assert!(config.tls.is_some());
        assert!(config.tls_config().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config: MongoConfig = r#"
            address = "db-1:27017,db-2:27017"
            database = "orders"
            max_open_connects = 100
            max_idle_connects = 10
            conn_max_life_time = 600

            [tls]
            ca_cert = "/etc/mongo/ca.pem"
            client_cert = "/etc/mongo/client.pem"
            client_cert_key = "/etc/mongo/client.key"

            [logger]
            enabled = true
            console = false
            level = "error"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.address, "db-1:27017,db-2:27017");
        assert_eq!(config.max_open_connects, 100);
        assert!(config.tls_config().is_some());
        assert!(config.logger.enabled);
        assert!(!config.logger.console);
        assert_eq!(config.logger.level, LogLevel::Error);
        assert_eq!(config.logger.slow_threshold_ms, 200);
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        let result: MongoResult<MongoConfig> = "databse = \"orders\"".parse();
        assert!(matches!(result, Err(MongoError::Toml(_))));
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: This test runs single-threaded and we clean up after
        unsafe {
            std::env::set_var("MONGOKIT_TEST_PASSWORD", "hunter2");
        }
        let expanded = expand_env_vars("password = \"${MONGOKIT_TEST_PASSWORD}\"");
        assert_eq!(expanded, "password = \"hunter2\"");

        let untouched = expand_env_vars("password = \"${MONGOKIT_TEST_UNSET_VAR}\"");
        assert_eq!(untouched, "password = \"${MONGOKIT_TEST_UNSET_VAR}\"");

        unsafe {
            std::env::remove_var("MONGOKIT_TEST_PASSWORD");
        }
    }

    #[tokio::test]
    async fn test_client_options_map_pool_settings() {
        let config = MongoConfig::builder()
            .address("localhost:27017")
            .database("orders")
            .credentials("svc", "secret")
            .app_name("billing")
            .max_open_connects(0)
            .max_idle_connects(3)
            .conn_max_life_time(Duration::from_secs(90))
            .build()
            .unwrap();

        let options = config.to_client_options().await.unwrap();
        assert_eq!(options.max_connecting, None);
        assert_eq!(options.max_pool_size, Some(3));
        assert_eq!(options.min_pool_size, None);
        assert_eq!(options.max_idle_time, Some(Duration::from_secs(90)));
        assert_eq!(options.app_name.as_deref(), Some("billing"));
        assert!(options.credential.is_some());
        assert!(options.command_event_handler.is_none());
    }

    #[tokio::test]
    async fn test_default_config_is_accepted_by_driver() {
        let options = MongoConfig::new("localhost:27017", "orders")
            .to_client_options()
            .await
            .unwrap();

        assert_eq!(options.max_connecting, None);
        assert_eq!(options.max_pool_size, None);
        assert_eq!(options.max_idle_time, None);
        assert!(mongodb::Client::with_options(options).is_ok());
    }

    #[tokio::test]
    async fn test_nonzero_pool_settings_are_accepted_by_driver() {
        let config = MongoConfig::builder()
            .database("orders")
            .max_open_connects(4)
            .max_idle_connects(20)
            .conn_max_life_time(Duration::from_secs(300))
            .build()
            .unwrap();

        let options = config.to_client_options().await.unwrap();
        assert_eq!(options.max_connecting, Some(4));
        assert_eq!(options.max_pool_size, Some(20));
        assert!(mongodb::Client::with_options(options).is_ok());
    }
}
