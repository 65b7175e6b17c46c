//! Command and query handlers.

pub mod auth;
pub mod chat;
pub mod relay;

pub use auth::{open_configured_session, LoginCommand, LoginHandler, LoginResult};
pub use chat::{
    CreateConversationCommand, CreateConversationHandler, CreateProjectCommand,
    CreateProjectHandler, DeleteConversationsCommand,
    DeleteConversationsHandler, GetConversationHandler, GetConversationQuery,
    ListConversationsHandler, ListConversationsQuery, ListOrganizationsHandler,
    ListOrganizationsQuery, ListProjectsHandler, ListProjectsQuery,
};
pub use relay::{
    EventStream, QuickChatCommand, QuickChatHandler, QuickChatResult, RelayCommand,
    RelaySettings, StreamRelay,
};
