//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, error types, and the state machine trait
//! used across the relay domain.

mod errors;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
