//! Conversation read models.
//!
//! The upstream owns these resources; the relay only needs a handful of
//! fields itself. Everything else the upstream sends is kept in `extra` and
//! serialized back out untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::ValidationError;

/// Identifies one conversation within one organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationRef {
    org_id: String,
    conversation_id: String,
}

impl ConversationRef {
    pub fn new(
        org_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let org_id = org_id.into();
        let conversation_id = conversation_id.into();
        if org_id.trim().is_empty() {
            return Err(ValidationError::empty_field("org_id"));
        }
        if conversation_id.trim().is_empty() {
            return Err(ValidationError::empty_field("conversation_id"));
        }
        Ok(Self {
            org_id,
            conversation_id,
        })
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}

/// Entry in a conversation listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A chat thread, with its messages when fetched individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conversation {
    /// A freshly created, empty conversation.
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, project_uuid: Option<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            project_uuid,
            created_at: None,
            updated_at: None,
            chat_messages: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            project_uuid: self.project_uuid.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            extra: Map::new(),
        }
    }
}

/// One message inside a conversation, in upstream order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
