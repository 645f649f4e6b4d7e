//! Server configuration.
//!
//! Loaded from `TICKCAST_*` environment variables; anything unset falls back
//! to the hub's defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tickcast_hub::{ConfigError, ConnectionConfig, HubConfig};

/// Environment variable for the bind host.
pub const ENV_HOST: &str = "TICKCAST_HOST";
/// Environment variable for the bind port.
pub const ENV_PORT: &str = "TICKCAST_PORT";
/// Environment variable for the per-client mailbox capacity.
pub const ENV_MAILBOX_CAPACITY: &str = "TICKCAST_MAILBOX_CAPACITY";
/// Environment variable for the hub's dispatch buffer.
pub const ENV_DISPATCH_BUFFER: &str = "TICKCAST_DISPATCH_BUFFER";
/// Environment variable for the write deadline, in seconds.
pub const ENV_WRITE_WAIT_SECS: &str = "TICKCAST_WRITE_WAIT_SECS";
/// Environment variable for the read deadline, in seconds.
pub const ENV_PONG_WAIT_SECS: &str = "TICKCAST_PONG_WAIT_SECS";
/// Environment variable for the keep-alive interval, in seconds.
pub const ENV_PING_PERIOD_SECS: &str = "TICKCAST_PING_PERIOD_SECS";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// The resulting hub or connection settings are inconsistent.
    #[error(transparent)]
    Hub(#[from] ConfigError),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Hub settings.
    pub hub: HubConfig,
    /// Per-connection settings.
    pub connection: ConnectionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl ServerConfig {
    /// Creates a configuration with default hub and connection settings.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            hub: HubConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }

    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the settings are
    /// inconsistent.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the settings are
    /// inconsistent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_var(&lookup, ENV_PORT)?.unwrap_or(DEFAULT_PORT);

        let mut hub = HubConfig::default();
        if let Some(capacity) = parse_var(&lookup, ENV_MAILBOX_CAPACITY)? {
            hub = hub.with_mailbox_capacity(capacity);
        }
        if let Some(buffer) = parse_var(&lookup, ENV_DISPATCH_BUFFER)? {
            hub = hub.with_dispatch_buffer(buffer);
        }

        let mut connection = ConnectionConfig::default();
        if let Some(secs) = parse_var(&lookup, ENV_WRITE_WAIT_SECS)? {
            connection = connection.with_write_wait(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var(&lookup, ENV_PONG_WAIT_SECS)? {
            connection = connection.with_pong_wait(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var(&lookup, ENV_PING_PERIOD_SECS)? {
            connection = connection.with_ping_period(Duration::from_secs(secs));
        }

        let config = Self {
            host,
            port,
            hub,
            connection,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the hub and connection settings.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ServerConfigError> {
        self.hub.validate()?;
        self.connection.validate()?;
        Ok(())
    }

    /// Returns the bind address as `host:port`.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ServerConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ServerConfigError::InvalidVar { name, value }),
    }
}
