//! Request DTOs for chat endpoints.
//!
//! Responses are the domain types themselves; they already serialize in
//! the upstream shape.

use serde::Deserialize;

use crate::domain::chat::ChatPrompt;
use crate::domain::foundation::ValidationError;

/// Query string for `GET /organizations/:org/projects`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// Request to create a project. `name` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Request to create a conversation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub chat_name: String,
    #[serde(default)]
    pub project_uuid: Option<String>,
}

/// Request carrying a prompt for a streamed reply.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    #[serde(alias = "message")]
    pub prompt: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl SendMessageRequest {
    pub fn into_prompt(self) -> Result<ChatPrompt, ValidationError> {
        ChatPrompt::new(self.prompt, self.timezone)
    }
}
