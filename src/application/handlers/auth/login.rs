//! LoginHandler - Establishes a per-caller upstream session.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::application::ChatError;
use crate::domain::chat::Organization;
use crate::domain::foundation::Timestamp;
use crate::domain::session::{SessionCredential, SessionError};
use crate::ports::{SessionContext, SessionStore, UpstreamConnector, UpstreamError};

/// Command to log in with an upstream session key.
#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub session_key: String,
    /// HTTP-date expiry; defaults to one year from now.
    pub expires: Option<String>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub session: Arc<SessionContext>,
    pub organizations: Vec<Organization>,
}

/// Handler for logging in.
pub struct LoginHandler {
    connector: Arc<dyn UpstreamConnector>,
    store: Arc<dyn SessionStore>,
}

impl LoginHandler {
    pub fn new(connector: Arc<dyn UpstreamConnector>, store: Arc<dyn SessionStore>) -> Self {
        Self { connector, store }
    }

    pub async fn handle(&self, cmd: LoginCommand) -> Result<LoginResult, ChatError> {
        self.handle_at(cmd, Timestamp::now()).await
    }

    #[instrument(skip_all)]
    pub async fn handle_at(&self, cmd: LoginCommand, now: Timestamp) -> Result<LoginResult, ChatError> {
        // 1. Local validation, no upstream call
        let credential = match cmd.expires.as_deref() {
            Some(expires) => {
                SessionCredential::new(cmd.session_key, Timestamp::parse_http_date(expires)?)?
            }
            None => SessionCredential::with_default_expiry(cmd.session_key, now)?,
        };
        if credential.is_expired_at(&now) {
            return Err(SessionError::expired(credential.expires_at().to_http_date()).into());
        }

        // 2. Verify against the upstream
        let provider = self.connector.connect(&credential)?;
        let organizations = match provider.authenticate().await {
            Ok(organizations) => organizations,
            Err(UpstreamError::AuthenticationFailed) | Err(UpstreamError::NotFound(_)) => {
                warn!(key = %credential.fingerprint(), "upstream rejected session key");
                return Err(SessionError::Rejected.into());
            }
            Err(e) => return Err(e.into()),
        };

        // 3. Remember the session
        let session = Arc::new(SessionContext::new(credential, provider));
        self.store.put(Arc::clone(&session)).await;

        info!(
            key = %session.credential().fingerprint(),
            organizations = organizations.len(),
            "session established"
        );
        Ok(LoginResult {
            session,
            organizations,
        })
    }
}
