//! Failures while reading or checking configuration

use thiserror::Error;

/// Reading the environment failed, or the result did not validate.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A configuration value that is present but unusable, or absent but required.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required setting {0}")]
    MissingRequired(&'static str),

    #[error("port must be non-zero")]
    InvalidPort,

    #[error("host is not an IP address: {0}")]
    InvalidHost(String),

    #[error("upstream base URL is not http(s): {0}")]
    InvalidUpstreamUrl(String),

    #[error("timeout {0} must be positive")]
    InvalidTimeout(&'static str),

    #[error("relay channel capacity must be at least 1")]
    InvalidChannelCapacity,
}
