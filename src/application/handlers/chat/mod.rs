//! Pass-through resource handlers.

mod conversations;
mod organizations;

pub use conversations::{
    CreateConversationCommand, CreateConversationHandler, DeleteConversationsCommand,
    DeleteConversationsHandler, GetConversationHandler, GetConversationQuery,
    ListConversationsHandler, ListConversationsQuery,
};
pub use organizations::{
    CreateProjectCommand, CreateProjectHandler, ListOrganizationsHandler, ListOrganizationsQuery,
    ListProjectsHandler, ListProjectsQuery,
};
