//! Session-specific error types.

use thiserror::Error;

use crate::domain::foundation::ValidationError;

/// Reasons a caller cannot obtain or use an upstream session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The presented key failed local validation; no upstream call was made.
    #[error("Invalid session credential: {0}")]
    InvalidCredential(#[from] ValidationError),

    /// The credential's expiry has passed.
    #[error("Session expired at {0}")]
    Expired(String),

    /// No session is associated with the request.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The process-wide credential is missing or malformed.
    #[error("Session key not configured: {0}")]
    NotConfigured(String),

    /// The upstream refused the credential.
    #[error("Invalid session key")]
    Rejected,

    /// `X-API-Key` header absent.
    #[error("Missing API key")]
    MissingApiKey,

    /// `X-API-Key` header present but wrong.
    #[error("Invalid API key")]
    InvalidApiKey,
}

impl SessionError {
    pub fn expired(at: impl Into<String>) -> Self {
        SessionError::Expired(at.into())
    }

    pub fn not_configured(reason: impl Into<String>) -> Self {
        SessionError::NotConfigured(reason.into())
    }

    /// True for failures detected before anything was sent upstream.
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::InvalidCredential(_))
    }
}
