//! Session Context - a credential bound to an upstream provider.
//!
//! Produced once per authenticated caller (at login) or once per process
//! (from configuration), then shared read-only behind an `Arc`. Every
//! operation that reaches the upstream goes through [`SessionContext::provider`],
//! which is where expiry is enforced.

use std::fmt;
use std::sync::Arc;

use super::UpstreamProvider;
use crate::domain::foundation::Timestamp;
use crate::domain::session::{SessionCredential, SessionError};

/// Validated credential plus the upstream client bound to it.
#[derive(Clone)]
pub struct SessionContext {
    credential: SessionCredential,
    provider: Arc<dyn UpstreamProvider>,
}

impl SessionContext {
    pub fn new(credential: SessionCredential, provider: Arc<dyn UpstreamProvider>) -> Self {
        Self {
            credential,
            provider,
        }
    }

    pub fn credential(&self) -> &SessionCredential {
        &self.credential
    }

    /// The bound provider, if the credential has not expired.
    pub fn provider(&self) -> Result<Arc<dyn UpstreamProvider>, SessionError> {
        self.provider_at(&Timestamp::now())
    }

    /// Same as [`provider`](Self::provider) with an explicit clock.
    pub fn provider_at(&self, now: &Timestamp) -> Result<Arc<dyn UpstreamProvider>, SessionError> {
        if self.credential.is_expired_at(now) {
            return Err(SessionError::expired(self.credential.expires_at().to_http_date()));
        }
        Ok(Arc::clone(&self.provider))
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}
