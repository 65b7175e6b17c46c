//! Application-level error type.

use thiserror::Error;

use crate::domain::foundation::ValidationError;
use crate::domain::session::SessionError;
use crate::ports::UpstreamError;

/// Everything that can stop a request before its response starts.
///
/// Failures after a relay stream has started are not errors at this level;
/// they travel in-band as `OutgoingEvent::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Malformed input; nothing was sent upstream.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Missing, expired, rejected or misconfigured credential.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A non-streaming upstream failure.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ChatError {
    /// True if the caller's credential is the problem.
    pub fn is_authentication(&self) -> bool {
        match self {
            ChatError::Session(SessionError::InvalidCredential(_)) => false,
            ChatError::Session(_) => true,
            ChatError::Upstream(UpstreamError::AuthenticationFailed) => true,
            _ => false,
        }
    }
}
