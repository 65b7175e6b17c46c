//! HTTP handlers for the login endpoint.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, response::IntoResponse, Json};

use crate::adapters::http::error::ApiError;
use crate::application::{LoginCommand, LoginHandler};

use super::dto::{LoginRequest, LoginResponse};

#[derive(Clone)]
pub struct AuthHandlers {
    login_handler: Arc<LoginHandler>,
}

impl AuthHandlers {
    pub fn new(login_handler: Arc<LoginHandler>) -> Self {
        Self { login_handler }
    }
}

/// POST /auth/login - Verify a session key and remember it
pub async fn login(
    State(handlers): State<AuthHandlers>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let cmd = LoginCommand {
        session_key: req.session_key,
        expires: req.expires,
    };

    let result = handlers.login_handler.handle(cmd).await?;
    tracing::info!(
        key = %result.session.credential().fingerprint(),
        organizations = result.organizations.len(),
        "login succeeded"
    );

    Ok(Json(LoginResponse::from(&result)))
}
