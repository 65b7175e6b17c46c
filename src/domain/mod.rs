//! Domain layer containing the relay's vocabulary and rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (timestamps, validation errors, state machines)
//! - `session` - Upstream session credentials and the per-caller session context
//! - `chat` - Organizations, projects, conversations, and outgoing stream events

pub mod chat;
pub mod foundation;
pub mod session;
