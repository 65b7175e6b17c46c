//! Typed configuration read from `CHAT_RELAY__*` environment variables.
//!
//! Sections: `server`, `upstream`, `auth`, `relay`. A `.env` file is read
//! first when present. Every field has a default, so an empty environment
//! yields a `login`-mode relay in front of claude.ai.
//!
//! ```no_run
//! use chat_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("configuration");
//! config.validate().expect("valid configuration");
//! ```

mod auth;
mod error;
mod relay;
mod server;
mod upstream;

pub use auth::{AuthConfig, AuthStrategyKind};
pub use error::{ConfigError, ValidationError};
pub use relay::RelayConfig;
pub use server::{Environment, LogFormat, ServerConfig};
pub use upstream::UpstreamConfig;

use serde::Deserialize;

/// All configuration sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream chat API configuration (base URL, optional session key)
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Authentication strategy for callers of this service
    #[serde(default)]
    pub auth: AuthConfig,

    /// Streaming relay limits
    #[serde(default)]
    pub relay: RelayConfig,
}

impl AppConfig {
    /// Reads `.env` (if any) and the process environment.
    ///
    /// `CHAT_RELAY__UPSTREAM__SESSION_KEY=sk-ant-...` sets
    /// `upstream.session_key`; `__` separates section from field.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks every section.
    ///
    /// The upstream session key is not required here; under `env` and
    /// `api_key` a missing key is reported per request instead.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.upstream.validate()?;
        self.auth.validate()?;
        self.relay.validate()?;
        Ok(())
    }
}
