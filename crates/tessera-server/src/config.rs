//! Server configuration.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tessera_server::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1")
//!     .http_port(3000)
//!     .shutdown_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
//! ```

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0";

/// Default HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default connection limit.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// Server configuration.
///
/// Deserializes from TOML or JSON with every field optional; unknown fields
/// are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// IP address to bind (e.g. `"0.0.0.0"`, `"::1"`).
    pub http_addr: String,

    /// TCP port to bind. `0` picks an ephemeral port.
    pub http_port: u16,

    /// Upper bound for reading the body and running the pipeline, per request.
    pub request_timeout_secs: u64,

    /// How long shutdown waits for open connections.
    pub shutdown_timeout_secs: u64,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Whether HTTP/1.1 keep-alive is enabled.
    pub keep_alive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            keep_alive: true,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Parses `http_addr` and `http_port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let ip: IpAddr = self.http_addr.parse()?;
        Ok(SocketAddr::new(ip, self.http_port))
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Shutdown timeout as a `Duration`.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Checks values that deserialize but cannot be served.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.socket_addr() {
            return Err(ConfigError::invalid_value("http_addr", e.to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::invalid_value(
                "max_connections",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind IP address.
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets the bind port.
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Sets the per-request timeout. Sub-second precision is dropped.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the graceful shutdown timeout. Sub-second precision is dropped.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the maximum number of concurrent connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Enables or disables keep-alive.
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.config.keep_alive = enabled;
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
