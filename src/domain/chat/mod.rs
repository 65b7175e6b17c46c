//! Chat domain module.
//!
//! Read models for the upstream's organizations, projects and conversations,
//! the validated inputs of a chat send, and the normalized event stream the
//! relay hands to clients.

mod conversation;
mod event;
mod organization;
mod prompt;
mod relay_phase;

pub use conversation::{ChatMessage, Conversation, ConversationRef, ConversationSummary};
pub use event::{OutgoingEvent, StreamFailure, UpstreamUnit, DONE_SENTINEL, TEXT_KEY};
pub use organization::{Organization, Project};
pub use prompt::{ChatPrompt, DEFAULT_TIMEZONE};
pub use relay_phase::RelayPhase;
