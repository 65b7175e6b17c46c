//! HTTP routes for authentication.

use axum::{routing::post, Router};

use super::handlers::{login, AuthHandlers};

/// Login route, mounted only under the `login` strategy.
pub fn auth_routes(handlers: AuthHandlers) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .with_state(handlers)
}
