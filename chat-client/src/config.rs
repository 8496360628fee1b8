//! Configuration loading for chatsync clients.
//!
//! Configuration is loaded from a TOML file; every field has a default.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the chat backend (default: http://localhost:3000).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Messages per fetched page (default: 20).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Per-request timeout in seconds (default: 15).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Endpoint paths.
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointConfig {
    /// Fetch-page endpoint (default: /chat/messages).
    #[serde(default = "default_fetch_page_path")]
    pub fetch_page: String,
    /// Send-message endpoint (default: /chat/send).
    #[serde(default = "default_send_message_path")]
    pub send_message: String,
    /// Mark-read endpoint (default: /chat/read).
    #[serde(default = "default_mark_read_path")]
    pub mark_read: String,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_page_size() -> u32 {
    20
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_fetch_page_path() -> String {
    "/chat/messages".to_string()
}

fn default_send_message_path() -> String {
    "/chat/send".to_string()
}

fn default_mark_read_path() -> String {
    "/chat/read".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            fetch_page: default_fetch_page_path(),
            send_message: default_send_message_path(),
            mark_read: default_mark_read_path(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// [`validate`](Self::validate).
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the backend base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Check the values a client cannot work without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        for path in [
            &self.endpoints.fetch_page,
            &self.endpoints.send_message,
            &self.endpoints.mark_read,
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "endpoint path must start with '/', got {:?}",
                    path
                )));
            }
        }
        Ok(())
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
