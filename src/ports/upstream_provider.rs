//! Upstream Provider Port - Interface to the conversational-AI backend.
//!
//! The relay never talks HTTP to the backend directly. Everything it needs
//! (resource reads, conversation management and the incremental reply
//! stream) goes through this port, so the HTTP-facing code can be tested
//! against an in-process mock.
//!
//! # Example
//!
//! ```ignore
//! let provider = connector.connect(&credential)?;
//! let orgs = provider.authenticate().await?;
//! let mut units = provider.stream_reply(&conversation, &prompt).await?;
//! while let Some(unit) = units.next().await { /* ... */ }
//! ```

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::chat::{
    ChatPrompt, Conversation, ConversationRef, ConversationSummary, Organization, Project,
    UpstreamUnit,
};
use crate::domain::session::SessionCredential;

/// Lazy, finite, non-restartable sequence of reply units.
///
/// Dropping the stream aborts the underlying connection.
pub type UnitStream = Pin<Box<dyn Stream<Item = Result<UpstreamUnit, UpstreamError>> + Send>>;

/// Port for one upstream session.
///
/// An implementation is bound to exactly one credential; see
/// [`UpstreamConnector`] for how instances are produced.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Verifies the bound credential by listing organizations.
    ///
    /// An empty listing means the credential reaches nothing usable and is
    /// treated as a rejection.
    async fn authenticate(&self) -> Result<Vec<Organization>, UpstreamError> {
        let organizations = self.list_organizations().await?;
        if organizations.is_empty() {
            return Err(UpstreamError::AuthenticationFailed);
        }
        Ok(organizations)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, UpstreamError>;

    async fn list_projects(
        &self,
        org_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Project>, UpstreamError>;

    async fn create_project(&self, org_id: &str, request: NewProject)
        -> Result<Project, UpstreamError>;

    async fn create_conversation(
        &self,
        org_id: &str,
        request: NewConversation,
    ) -> Result<Conversation, UpstreamError>;

    async fn list_conversations(&self, org_id: &str)
        -> Result<Vec<ConversationSummary>, UpstreamError>;

    async fn get_conversation(
        &self,
        conversation: &ConversationRef,
    ) -> Result<Conversation, UpstreamError>;

    /// Deletes a batch of conversations.
    ///
    /// The upstream acknowledgement is returned as-is; callers must not
    /// reinterpret partial results.
    async fn delete_conversations(
        &self,
        org_id: &str,
        conversation_ids: &[String],
    ) -> Result<Value, UpstreamError>;

    /// Sends a prompt and opens the incremental reply.
    ///
    /// Errors returned here happen before any unit exists. Errors yielded by
    /// the stream happen after the connection was accepted.
    async fn stream_reply(
        &self,
        conversation: &ConversationRef,
        prompt: &ChatPrompt,
    ) -> Result<UnitStream, UpstreamError>;
}

/// Binds an upstream provider to a credential.
pub trait UpstreamConnector: Send + Sync {
    fn connect(&self, credential: &SessionCredential)
        -> Result<Arc<dyn UpstreamProvider>, UpstreamError>;
}

/// Parameters for creating a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
}

/// Parameters for creating a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewConversation {
    pub name: String,
    pub project_uuid: Option<String>,
}

impl NewConversation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project_uuid: None,
        }
    }

    pub fn in_project(mut self, project_uuid: impl Into<String>) -> Self {
        self.project_uuid = Some(project_uuid.into());
        self
    }
}

/// Errors from upstream operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Credential rejected (401/403, or nothing reachable).
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream refused the request (other 4xx).
    #[error("upstream rejected request ({status}): {message}")]
    Rejected {
        /// Upstream HTTP status.
        status: u16,
        /// Upstream detail.
        message: String,
    },

    /// Upstream failed on its side (5xx).
    #[error("upstream unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with something unparseable.
    #[error("parse error: {0}")]
    Parse(String),

    /// No data within the allotted time.
    #[error("upstream timed out after {timeout_secs}s")]
    Timeout {
        /// Limit that was exceeded.
        timeout_secs: u64,
    },

    /// Failure reported inside the reply stream.
    #[error("stream error: {0}")]
    Stream(String),
}

impl UpstreamError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Maps an upstream HTTP status and body to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::AuthenticationFailed,
            404 => Self::NotFound(body),
            400..=499 => Self::rejected(status, body),
            _ => Self::unavailable(format!("status {}: {}", status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(UpstreamError::from_status(401, "x"), UpstreamError::AuthenticationFailed);
        assert_eq!(UpstreamError::from_status(403, "x"), UpstreamError::AuthenticationFailed);
        assert_eq!(
            UpstreamError::from_status(404, "no such chat"),
            UpstreamError::not_found("no such chat")
        );
        assert_eq!(
            UpstreamError::from_status(422, "prompt too long"),
            UpstreamError::rejected(422, "prompt too long")
        );
        assert!(matches!(
            UpstreamError::from_status(503, "busy"),
            UpstreamError::Unavailable { .. }
        ));
    }

    #[test]
    fn new_conversation_builder() {
        let request = NewConversation::new("Trip").in_project("p1");
        assert_eq!(request.name, "Trip");
        assert_eq!(request.project_uuid.as_deref(), Some("p1"));
        assert_eq!(NewConversation::default().name, "");
    }
}
