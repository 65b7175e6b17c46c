//! Request/response DTOs for the login endpoint.

use serde::{Deserialize, Serialize};

use crate::application::LoginResult;

pub const LOGIN_MESSAGE: &str = "Successfully authenticated with claude.ai";

/// Request to log in with an upstream session key.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub session_key: String,
    /// HTTP-date, e.g. `Tue, 19 Oct 2027 10:00:00 UTC`.
    #[serde(default)]
    pub expires: Option<String>,
}

/// Response for a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub session_key: String,
    pub expires: String,
}

impl From<&LoginResult> for LoginResponse {
    fn from(result: &LoginResult) -> Self {
        let credential = result.session.credential();
        Self {
            message: LOGIN_MESSAGE.to_string(),
            session_key: credential.expose_key().to_string(),
            expires: credential.expires_at().to_http_date(),
        }
    }
}
