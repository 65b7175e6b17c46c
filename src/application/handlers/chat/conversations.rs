//! Conversation commands and queries.
//!
//! Straight pass-through to the upstream: no caching and no pagination of
//! our own.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::ChatError;
use crate::domain::chat::{Conversation, ConversationRef, ConversationSummary};
use crate::domain::foundation::ValidationError;
use crate::ports::{NewConversation, SessionContext};

fn require_org(org_id: &str) -> Result<(), ValidationError> {
    if org_id.trim().is_empty() {
        return Err(ValidationError::empty_field("org_id"));
    }
    Ok(())
}

// ── Create ─────────────────────────────────────────────────────────────────

/// Command to create a conversation.
#[derive(Debug, Clone)]
pub struct CreateConversationCommand {
    pub session: Arc<SessionContext>,
    pub org_id: String,
    pub name: String,
    pub project_uuid: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateConversationHandler;

impl CreateConversationHandler {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(org = %cmd.org_id))]
    pub async fn handle(&self, cmd: CreateConversationCommand) -> Result<Conversation, ChatError> {
        require_org(&cmd.org_id)?;
        let provider = cmd.session.provider()?;

        let mut request = NewConversation::new(cmd.name);
        if let Some(project) = cmd.project_uuid.filter(|p| !p.trim().is_empty()) {
            request = request.in_project(project);
        }

        let conversation = provider.create_conversation(&cmd.org_id, request).await?;
        info!(conversation = %conversation.uuid, "conversation created");
        Ok(conversation)
    }
}

// ── List ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ListConversationsQuery {
    pub session: Arc<SessionContext>,
    pub org_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListConversationsHandler;

impl ListConversationsHandler {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(org = %query.org_id))]
    pub async fn handle(
        &self,
        query: ListConversationsQuery,
    ) -> Result<Vec<ConversationSummary>, ChatError> {
        require_org(&query.org_id)?;
        let provider = query.session.provider()?;
        Ok(provider.list_conversations(&query.org_id).await?)
    }
}

// ── Get ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GetConversationQuery {
    pub session: Arc<SessionContext>,
    pub org_id: String,
    pub conversation_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct GetConversationHandler;

impl GetConversationHandler {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(org = %query.org_id, conversation = %query.conversation_id))]
    pub async fn handle(&self, query: GetConversationQuery) -> Result<Conversation, ChatError> {
        let reference = ConversationRef::new(query.org_id, query.conversation_id)?;
        let provider = query.session.provider()?;
        Ok(provider.get_conversation(&reference).await?)
    }
}

// ── Delete ─────────────────────────────────────────────────────────────────

/// Command to delete a batch of conversations.
#[derive(Debug, Clone)]
pub struct DeleteConversationsCommand {
    pub session: Arc<SessionContext>,
    pub org_id: String,
    pub conversation_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteConversationsHandler;

impl DeleteConversationsHandler {
    pub fn new() -> Self {
        Self
    }

    /// Returns the upstream acknowledgement unchanged.
    #[instrument(skip_all, fields(org = %cmd.org_id, count = cmd.conversation_ids.len()))]
    pub async fn handle(&self, cmd: DeleteConversationsCommand) -> Result<Value, ChatError> {
        require_org(&cmd.org_id)?;
        if cmd.conversation_ids.is_empty() {
            return Err(ValidationError::empty_field("conversation_ids").into());
        }
        if cmd.conversation_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ValidationError::invalid_format(
                "conversation_ids",
                "ids must not be blank",
            )
            .into());
        }

        let provider = cmd.session.provider()?;
        Ok(provider
            .delete_conversations(&cmd.org_id, &cmd.conversation_ids)
            .await?)
    }
}
