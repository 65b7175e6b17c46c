//! HTTP adapters - REST and SSE endpoints.
//!
//! - `auth` - `/auth/login`
//! - `chat` - organizations, conversations, streamed replies
//! - `middleware` - session resolution per authentication strategy
//! - `error` - error body and status mapping

pub mod auth;
pub mod chat;
pub mod error;
pub mod middleware;
mod router;

pub use error::{ApiError, ErrorResponse};
pub use middleware::AuthStrategy;
pub use router::app_router;
