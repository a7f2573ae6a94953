//! Configuration management for taskstream.
//!
//! Configuration can be set via environment variables:
//! - `AGENT_BASE_URL` - Optional. Base URL of the agent backend. Defaults to `http://127.0.0.1:3000`.
//! - `CONNECT_TIMEOUT_SECS` - Optional. Connection timeout in seconds. Defaults to `10`.
//! - `STREAMING` - Optional. Whether the binary uses the streaming submit path. Defaults to `true`.

use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the agent backend
    pub base_url: Url,

    /// Connection timeout for outgoing requests
    pub connect_timeout: Duration,

    /// Whether the binary submits via the streaming endpoint
    pub streaming: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `AGENT_BASE_URL` is not a valid
    /// URL or `CONNECT_TIMEOUT_SECS` is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("AGENT_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        let base_url = Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidValue("AGENT_BASE_URL".to_string(), e.to_string()))?;

        let connect_timeout = std::env::var("CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidValue("CONNECT_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;

        let streaming = std::env::var("STREAMING")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Self {
            base_url,
            connect_timeout,
            streaming,
        })
    }

    /// Create a config pointing at a specific backend (useful for testing).
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout: Duration::from_secs(10),
            streaming: true,
        }
    }
}
