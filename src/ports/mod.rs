//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application and the outside world. Adapters implement these ports.
//!
//! - `UpstreamProvider` / `UpstreamConnector` - the conversational-AI backend
//! - `SessionContext` - a credential bound to one provider instance
//! - `SessionStore` - logged-in sessions, keyed by session key

mod session_context;
mod session_store;
mod upstream_provider;

pub use session_context::SessionContext;
pub use session_store::SessionStore;
pub use upstream_provider::{
    NewConversation, NewProject, UnitStream, UpstreamConnector, UpstreamError, UpstreamProvider,
};
