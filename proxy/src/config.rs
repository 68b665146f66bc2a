use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Values endpoint of the Google Sheets v4 API.
pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Upstream base URL must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("Upstream base URL cannot be used as a base: {0}")]
    NotABaseUrl(String),
}

/// Proxy configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for spreadsheet value requests
    pub listener: Listener,
    /// Listener for health and readiness checks
    pub admin_listener: Listener,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.upstream.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Where spreadsheet values are fetched from.
///
/// Only the base URL is configurable. Timeouts are fixed, and the API key
/// is read from the environment rather than from the config file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: Url,
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.base_url.scheme() {
            "http" | "https" => {}
            other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
        }
        if self.base_url.cannot_be_a_base() {
            return Err(ValidationError::NotABaseUrl(self.base_url.to_string()));
        }
        Ok(())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}
