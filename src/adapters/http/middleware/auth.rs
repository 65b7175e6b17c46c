//! Session resolution middleware and extractor for axum.
//!
//! This module provides:
//! - `SessionResolver` - port-like seam that turns request headers into a session
//! - `AuthStrategy` - the resolver chosen at startup (`login`, `env`, `api_key`)
//! - `session_middleware` - layer that resolves the session and injects it into extensions
//! - `RequireSession` - extractor that reads it back in handlers
//!
//! ```text
//! Request → session_middleware → injects Arc<SessionContext> into extensions
//!                                      ↓
//!                         Handler → RequireSession extractor reads from extensions
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, Secret};
use subtle::ConstantTimeEq;

use crate::adapters::http::error::ApiError;
use crate::application::open_configured_session;
use crate::config::{AuthConfig, AuthStrategyKind, UpstreamConfig};
use crate::domain::foundation::Timestamp;
use crate::domain::session::SessionError;
use crate::ports::{SessionContext, SessionStore, UpstreamConnector};

/// Header carrying the service API key under the `api_key` strategy.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Resolves the caller's session from request headers.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Arc<SessionContext>, SessionError>;
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// `login` strategy: `Authorization: Bearer <session_key>` of a prior login.
///
/// An expired session is dropped from the store the first time it is presented.
pub struct BearerSessionResolver {
    store: Arc<dyn SessionStore>,
}

impl BearerSessionResolver {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionResolver for BearerSessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Arc<SessionContext>, SessionError> {
        let token = bearer_token(headers).ok_or(SessionError::NotAuthenticated)?;
        let session = self
            .store
            .get(token)
            .await
            .ok_or(SessionError::NotAuthenticated)?;

        let credential = session.credential();
        if credential.is_expired_at(&Timestamp::now()) {
            self.store.remove(token).await;
            tracing::debug!(session = %credential.fingerprint(), "evicted expired session");
            return Err(SessionError::expired(credential.expires_at().to_http_date()));
        }
        Ok(session)
    }
}

/// `env` strategy: one process-wide session from configuration.
///
/// If the configured key was missing or malformed, every request gets the
/// same `NotConfigured` error.
pub struct ConfiguredSessionResolver {
    session: Result<Arc<SessionContext>, SessionError>,
}

impl ConfiguredSessionResolver {
    pub fn new(session: Result<Arc<SessionContext>, SessionError>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SessionResolver for ConfiguredSessionResolver {
    async fn resolve(&self, _headers: &HeaderMap) -> Result<Arc<SessionContext>, SessionError> {
        self.session.clone()
    }
}

/// `api_key` strategy: the configured session, gated by `X-API-Key`.
pub struct ApiKeySessionResolver {
    api_key: Option<Secret<String>>,
    inner: ConfiguredSessionResolver,
}

impl ApiKeySessionResolver {
    pub fn new(
        api_key: Option<Secret<String>>,
        session: Result<Arc<SessionContext>, SessionError>,
    ) -> Self {
        Self {
            api_key,
            inner: ConfiguredSessionResolver::new(session),
        }
    }
}

#[async_trait]
impl SessionResolver for ApiKeySessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Arc<SessionContext>, SessionError> {
        let presented = headers
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|k| !k.is_empty())
            .ok_or(SessionError::MissingApiKey)?;

        let expected = self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().as_bytes())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SessionError::not_configured("service API key is not set"))?;

        if !bool::from(presented.as_bytes().ct_eq(expected)) {
            return Err(SessionError::InvalidApiKey);
        }
        self.inner.resolve(headers).await
    }
}

/// Authentication strategy selected at startup.
#[derive(Clone)]
pub enum AuthStrategy {
    /// Per-caller sessions established via `/auth/login`.
    Login { store: Arc<dyn SessionStore> },
    /// One configured session, no caller authentication.
    Env {
        session: Result<Arc<SessionContext>, SessionError>,
    },
    /// One configured session behind a service API key.
    ApiKey {
        api_key: Option<Secret<String>>,
        session: Result<Arc<SessionContext>, SessionError>,
    },
}

impl AuthStrategy {
    /// Builds the configured strategy.
    ///
    /// For `env` and `api_key` the upstream session is opened once here. A
    /// failure is kept and reported on every request rather than at startup.
    pub fn from_config(
        auth: &AuthConfig,
        upstream: &UpstreamConfig,
        connector: &dyn UpstreamConnector,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        match auth.strategy {
            AuthStrategyKind::Login => AuthStrategy::Login { store },
            AuthStrategyKind::Env => AuthStrategy::Env {
                session: open_configured_session(upstream, connector, Timestamp::now()),
            },
            AuthStrategyKind::ApiKey => AuthStrategy::ApiKey {
                api_key: auth.api_key.clone(),
                session: open_configured_session(upstream, connector, Timestamp::now()),
            },
        }
    }

    pub fn resolver(&self) -> Arc<dyn SessionResolver> {
        match self {
            AuthStrategy::Login { store } => Arc::new(BearerSessionResolver::new(Arc::clone(store))),
            AuthStrategy::Env { session } => Arc::new(ConfiguredSessionResolver::new(session.clone())),
            AuthStrategy::ApiKey { api_key, session } => {
                Arc::new(ApiKeySessionResolver::new(api_key.clone(), session.clone()))
            }
        }
    }

    /// Where logins are kept; `None` when `/auth/login` is not served.
    pub fn login_store(&self) -> Option<&Arc<dyn SessionStore>> {
        match self {
            AuthStrategy::Login { store } => Some(store),
            AuthStrategy::Env { .. } | AuthStrategy::ApiKey { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthStrategy::Login { .. } => "login",
            AuthStrategy::Env { .. } => "env",
            AuthStrategy::ApiKey { .. } => "api_key",
        }
    }
}

/// Middleware state - the strategy's resolver.
pub type SessionResolverState = Arc<dyn SessionResolver>;

/// Resolves the session or rejects the request.
pub async fn session_middleware(
    State(resolver): State<SessionResolverState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolver.resolve(request.headers()).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "session resolution failed");
            ApiError::from(e).into_response()
        }
    }
}

/// Extractor for the session injected by [`session_middleware`].
#[derive(Debug, Clone)]
pub struct RequireSession(pub Arc<SessionContext>);

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<SessionContext>>()
            .cloned()
            .map(RequireSession)
            .ok_or_else(|| SessionError::NotAuthenticated.into())
    }
}
