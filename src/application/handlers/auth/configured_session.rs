//! Process-wide session built from configuration.
//!
//! Used by the `env` and `api_key` strategies. A missing or malformed key is
//! not fatal at startup; it is reported as `SessionError::NotConfigured` on
//! every request instead.

use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::UpstreamConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::session::{SessionCredential, SessionError};
use crate::ports::{SessionContext, UpstreamConnector};

pub fn open_configured_session(
    config: &UpstreamConfig,
    connector: &dyn UpstreamConnector,
    now: Timestamp,
) -> Result<Arc<SessionContext>, SessionError> {
    let result = build(config, connector, now);
    match &result {
        Ok(session) => info!(
            key = %session.credential().fingerprint(),
            expires = %session.credential().expires_at().to_http_date(),
            "using configured session key"
        ),
        Err(e) => warn!(error = %e, "configured session unavailable"),
    }
    result
}

fn build(
    config: &UpstreamConfig,
    connector: &dyn UpstreamConnector,
    now: Timestamp,
) -> Result<Arc<SessionContext>, SessionError> {
    let key = config
        .session_key
        .as_ref()
        .map(|k| k.expose_secret().clone())
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| SessionError::not_configured("upstream session key is not set"))?;

    let credential = match config.session_expiry.as_deref() {
        Some(expiry) => {
            let expires_at = Timestamp::parse_http_date(expiry)
                .map_err(|e| SessionError::not_configured(e.to_string()))?;
            SessionCredential::new(key, expires_at)
        }
        None => SessionCredential::with_default_expiry(key, now),
    }
    .map_err(|e| SessionError::not_configured(e.to_string()))?;

    let provider = connector
        .connect(&credential)
        .map_err(|e| SessionError::not_configured(e.to_string()))?;

    Ok(Arc::new(SessionContext::new(credential, provider)))
}
