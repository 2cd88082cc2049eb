//! Layered configuration loading.
//!
//! Later layers override earlier ones:
//! 1. Default values
//! 2. Configuration file (TOML or JSON, chosen by extension)
//! 3. Environment variables (`TESSERA_HTTP_PORT=9000`)

use std::env;
use std::fs;
use std::path::Path;

use crate::config::ServerConfig;
use crate::error::ConfigError;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "TESSERA";

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use tessera_server::ConfigLoader;
///
/// # fn main() -> Result<(), tessera_server::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()
///     .with_optional_file("tessera.toml")?
///     .with_env_prefix("TESSERA")
///     .load()?;
/// # let _ = config;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: ServerConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader starting from [`ServerConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a TOML or JSON file. Fields missing from the file keep their
    /// default values.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = Self::parse(&content, &extension)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");

        Ok(self)
    }

    /// Like [`with_file`](Self::with_file) but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in the given format (`"toml"` or `"json"`).
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = Self::parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Enables environment overrides named `{PREFIX}_{FIELD}`, e.g.
    /// `TESSERA_HTTP_PORT` or `TESSERA_KEEP_ALIVE`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads a `.env` file into the process environment if one exists.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        self
    }

    /// Applies environment overrides and validates the result.
    pub fn load(mut self) -> Result<ServerConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_vars(&prefix, env::vars())?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> ServerConfig {
        self.config
    }

    fn parse(content: &str, format: &str) -> Result<ServerConfig, ConfigError> {
        match format {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn apply_env_vars(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let prefix = format!("{prefix}_");
        for (key, value) in vars {
            if let Some(field) = key.strip_prefix(&prefix) {
                self.apply_env_var(&key, field, &value)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, field: &str, value: &str) -> Result<(), ConfigError> {
        match field {
            "HTTP_ADDR" => self.config.http_addr = value.to_string(),
            "HTTP_PORT" => {
                self.config.http_port = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected port number"))?;
            }
            "REQUEST_TIMEOUT_SECS" => {
                self.config.request_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "SHUTDOWN_TIMEOUT_SECS" => {
                self.config.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "MAX_CONNECTIONS" => {
                self.config.max_connections = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "KEEP_ALIVE" => {
                self.config.keep_alive = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            // Other variables under the prefix belong to other components.
            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
