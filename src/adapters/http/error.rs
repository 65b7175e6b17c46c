//! HTTP error mapping.
//!
//! Every failure that happens before a response starts is rendered as
//! `{"code": "...", "message": "..."}` with a matching status. Failures after
//! an event stream has started never come through here.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::application::ChatError;
use crate::domain::foundation::ValidationError;
use crate::domain::session::SessionError;
use crate::ports::UpstreamError;

/// Standard error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }
}

/// API error type that converts application errors to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    Chat(ChatError),
    /// The request body could not be read as the expected JSON.
    MalformedBody(String),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::Chat(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Chat(err.into())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Chat(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl ApiError {
    /// Status and error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        let chat = match self {
            ApiError::MalformedBody(_) => return (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Chat(chat) => chat,
        };
        match chat {
            ChatError::Validation(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ChatError::Session(session) => match session {
                SessionError::InvalidCredential(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                SessionError::InvalidApiKey => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                SessionError::Expired(_)
                | SessionError::NotAuthenticated
                | SessionError::NotConfigured(_)
                | SessionError::Rejected
                | SessionError::MissingApiKey => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            },
            ChatError::Upstream(upstream) => match upstream {
                UpstreamError::AuthenticationFailed => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                UpstreamError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                UpstreamError::Rejected { .. } => (StatusCode::BAD_REQUEST, "UPSTREAM_ERROR"),
                UpstreamError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
                UpstreamError::Unavailable { .. }
                | UpstreamError::Network(_)
                | UpstreamError::Parse(_)
                | UpstreamError::Stream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            },
        }
    }

    fn body(&self) -> ErrorResponse {
        let (_, code) = self.status_and_code();
        match self {
            ApiError::MalformedBody(message) => ErrorResponse::new(code, message.clone()),
            ApiError::Chat(ChatError::Upstream(UpstreamError::Rejected { status, message })) => {
                ErrorResponse::new(code, message.clone())
                    .with_details(serde_json::json!({ "upstream_status": status }))
            }
            ApiError::Chat(err) => ErrorResponse::new(code, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = ?self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
