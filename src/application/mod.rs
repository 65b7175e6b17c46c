//! Application layer - Commands, Queries, and Handlers.
//!
//! Handlers orchestrate domain values and ports. Each command or query
//! carries the caller's `SessionContext`, resolved by the HTTP layer from
//! the configured authentication strategy.

mod errors;
pub mod handlers;

pub use errors::ChatError;
pub use handlers::{
    // Auth
    open_configured_session, LoginCommand, LoginHandler, LoginResult,
    // Resources
    CreateConversationCommand, CreateConversationHandler, CreateProjectCommand,
    CreateProjectHandler, DeleteConversationsCommand,
    DeleteConversationsHandler, GetConversationHandler, GetConversationQuery,
    ListConversationsHandler, ListConversationsQuery, ListOrganizationsHandler,
    ListOrganizationsQuery, ListProjectsHandler, ListProjectsQuery,
    // Relay
    EventStream, QuickChatCommand, QuickChatHandler, QuickChatResult, RelayCommand,
    RelaySettings, StreamRelay,
};
