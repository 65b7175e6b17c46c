//! Upstream session credential value object.

use std::fmt;

use secrecy::{ExposeSecret, Secret};

use crate::domain::foundation::{Timestamp, ValidationError};

/// Literal prefix every accepted session key starts with.
pub const SESSION_KEY_PREFIX: &str = "sk-ant-";

/// Lifetime assumed when a login does not state an expiry.
pub const DEFAULT_SESSION_LIFETIME_DAYS: i64 = 365;

/// A validated upstream session key and its expiry.
///
/// The key is kept in a [`Secret`] and never appears in `Debug` output;
/// use [`SessionCredential::fingerprint`] when a key must be identified in logs.
#[derive(Clone)]
pub struct SessionCredential {
    key: Secret<String>,
    expires_at: Timestamp,
}

impl SessionCredential {
    /// Validates the key prefix and builds a credential.
    ///
    /// Expiry is *not* checked here; an already expired credential is
    /// refused when it is first used.
    pub fn new(key: impl Into<String>, expires_at: Timestamp) -> Result<Self, ValidationError> {
        let key = key.into();
        let trimmed = key.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("session_key"));
        }
        if !trimmed.starts_with(SESSION_KEY_PREFIX) || trimmed.len() == SESSION_KEY_PREFIX.len() {
            return Err(ValidationError::invalid_format(
                "session_key",
                format!("Session key must start with {}", SESSION_KEY_PREFIX),
            ));
        }

        Ok(Self {
            key: Secret::new(trimmed.to_string()),
            expires_at,
        })
    }

    /// Builds a credential that expires [`DEFAULT_SESSION_LIFETIME_DAYS`] after `now`.
    pub fn with_default_expiry(
        key: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        Self::new(key, now.add_days(DEFAULT_SESSION_LIFETIME_DAYS))
    }

    /// The raw key, for building upstream requests.
    pub fn expose_key(&self) -> &str {
        self.key.expose_secret()
    }

    /// When this credential stops being valid.
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// True once `now` is strictly past the expiry.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }

    /// Prefix plus the last four characters, safe for logs.
    pub fn fingerprint(&self) -> String {
        let key = self.expose_key();
        let tail: String = key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}…{}", SESSION_KEY_PREFIX, tail)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("key", &self.fingerprint())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
