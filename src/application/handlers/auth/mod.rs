//! Session establishment handlers.

mod configured_session;
mod login;

pub use configured_session::open_configured_session;
pub use login::{LoginCommand, LoginHandler, LoginResult};
