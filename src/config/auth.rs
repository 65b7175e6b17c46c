//! Caller authentication configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;

/// How callers of this service obtain an upstream session.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategyKind {
    /// `POST /auth/login` creates a per-caller session; requests carry it as a Bearer token.
    #[default]
    Login,
    /// One process-wide session from `upstream.session_key`.
    Env,
    /// Like `Env`, gated by an `X-API-Key` header.
    ApiKey,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Selected strategy
    #[serde(default)]
    pub strategy: AuthStrategyKind,

    /// Shared API key for the `api_key` strategy
    pub api_key: Option<Secret<String>>,
}

impl AuthConfig {
    /// Check if a non-empty API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Validate auth configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.strategy == AuthStrategyKind::ApiKey && !self.has_api_key() {
            return Err(ValidationError::MissingRequired("AUTH__API_KEY"));
        }
        Ok(())
    }
}
