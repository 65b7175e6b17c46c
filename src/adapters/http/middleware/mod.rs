//! HTTP middleware for axum.
//!
//! - `auth` - session resolution per authentication strategy, and the
//!   `RequireSession` extractor

pub mod auth;

pub use auth::{
    session_middleware, ApiKeySessionResolver, AuthStrategy, BearerSessionResolver,
    ConfiguredSessionResolver, RequireSession, SessionResolver, SessionResolverState,
    API_KEY_HEADER,
};
