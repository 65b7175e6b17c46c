//! Session domain module.
//!
//! An upstream session is a `sk-ant-` session key plus the moment it stops
//! being honoured. It is created at login (or from configuration), held in
//! memory only, and checked for expiry every time it is used.

mod credential;
mod errors;

pub use credential::{SessionCredential, DEFAULT_SESSION_LIFETIME_DAYS, SESSION_KEY_PREFIX};
pub use errors::SessionError;
