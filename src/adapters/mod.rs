//! Adapters - Implementations of port interfaces.
//!
//! - `http` - axum REST/SSE surface
//! - `session` - in-memory session store
//! - `upstream` - claude.ai client and a scripted mock

pub mod http;
pub mod session;
pub mod upstream;
