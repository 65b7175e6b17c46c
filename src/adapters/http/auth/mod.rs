//! Login endpoint.

mod dto;
mod handlers;
mod routes;

pub use dto::{LoginRequest, LoginResponse, LOGIN_MESSAGE};
pub use handlers::{login, AuthHandlers};
pub use routes::auth_routes;
