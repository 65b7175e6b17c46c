//! Upstream chat API configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Upstream chat API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API (no trailing slash)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session key used by the `env` and `api_key` auth strategies
    pub session_key: Option<Secret<String>>,

    /// Optional expiry for the configured session key, HTTP-date format
    pub session_expiry: Option<String>,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Timeout in seconds for non-streaming upstream calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl UpstreamConfig {
    /// Connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check if a non-empty session key is configured
    pub fn has_session_key(&self) -> bool {
        self.session_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Validate upstream configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidUpstreamUrl(self.base_url.clone()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("upstream.connect_timeout_secs"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("upstream.request_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_key: None,
            session_expiry: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://claude.ai/api".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    concat!("chat-relay/", env!("CARGO_PKG_VERSION")).to_string()
}
