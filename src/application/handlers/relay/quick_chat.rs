//! QuickChatHandler - Creates a conversation and relays the first prompt.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{EventStream, RelayCommand, StreamRelay};
use crate::application::ChatError;
use crate::domain::chat::{ChatPrompt, Conversation, ConversationRef};
use crate::domain::foundation::ValidationError;
use crate::ports::{NewConversation, SessionContext};

/// Command to start a new conversation with a prompt.
#[derive(Debug, Clone)]
pub struct QuickChatCommand {
    pub session: Arc<SessionContext>,
    pub org_id: String,
    pub prompt: ChatPrompt,
}

/// The conversation that was created and the relayed reply.
pub struct QuickChatResult {
    pub conversation: Conversation,
    pub events: EventStream,
}

/// Handler for quick chat.
pub struct QuickChatHandler {
    relay: Arc<StreamRelay>,
}

impl QuickChatHandler {
    pub fn new(relay: Arc<StreamRelay>) -> Self {
        Self { relay }
    }

    #[instrument(skip_all, fields(org = %cmd.org_id))]
    pub async fn handle(&self, cmd: QuickChatCommand) -> Result<QuickChatResult, ChatError> {
        if cmd.org_id.trim().is_empty() {
            return Err(ValidationError::empty_field("org_id").into());
        }

        // 1. Create; if this fails the relay is never invoked
        let provider = cmd.session.provider()?;
        let conversation = provider
            .create_conversation(&cmd.org_id, NewConversation::default())
            .await?;
        info!(conversation = %conversation.uuid, "quick chat conversation created");

        // 2. Relay into it
        let reference = ConversationRef::new(cmd.org_id, conversation.uuid.clone())?;
        let events = self
            .relay
            .handle(RelayCommand {
                session: cmd.session,
                conversation: reference,
                prompt: cmd.prompt,
            })
            .await
            .map_err(|e| {
                // The conversation stays upstream, empty.
                warn!(
                    conversation = %conversation.uuid,
                    error = %e,
                    "quick chat left an orphaned conversation"
                );
                e
            })?;

        Ok(QuickChatResult {
            conversation,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::upstream::{MockCall, MockOperation, MockReply, MockUpstream};
    use crate::application::handlers::testing::session_for;
    use crate::application::RelaySettings;
    use crate::domain::chat::DONE_SENTINEL;
    use crate::ports::{UpstreamError, UpstreamProvider};
    use futures::StreamExt;

    fn handler() -> QuickChatHandler {
        QuickChatHandler::new(Arc::new(StreamRelay::new(RelaySettings::default())))
    }

    fn command(upstream: &MockUpstream) -> QuickChatCommand {
        QuickChatCommand {
            session: session_for(upstream),
            org_id: "org-1".to_string(),
            prompt: ChatPrompt::new("hello", Some("Europe/Berlin".to_string())).unwrap(),
        }
    }

    #[tokio::test]
    async fn creates_then_relays_into_new_conversation() {
        let upstream = MockUpstream::new().with_reply(MockReply::text(["Hi", " there"]));

        let result = handler().handle(command(&upstream)).await.unwrap();
        let events: Vec<String> = result.events.map(|e| e.to_data()).collect().await;

        assert_eq!(
            events,
            vec![r#"{"text":"Hi"}"#, r#"{"text":" there"}"#, DONE_SENTINEL]
        );
        let calls = upstream.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], MockCall::CreateConversation { name, .. } if name.is_empty()));
        assert_eq!(
            calls[1],
            MockCall::StreamReply {
                org_id: "org-1".to_string(),
                conversation_id: result.conversation.uuid.clone(),
                prompt: "hello".to_string(),
                timezone: "Europe/Berlin".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn failed_creation_skips_the_relay() {
        let upstream = MockUpstream::new().with_operation_error(
            MockOperation::CreateConversation,
            UpstreamError::rejected(400, "bad org"),
        );

        let err = handler().handle(command(&upstream)).await.err().unwrap();

        assert_eq!(err, ChatError::Upstream(UpstreamError::rejected(400, "bad org")));
        assert_eq!(upstream.calls_to(MockOperation::StreamReply), 0);
    }

    #[tokio::test]
    async fn relay_failure_keeps_the_created_conversation() {
        let upstream = MockUpstream::new()
            .with_reply(MockReply::Error(UpstreamError::unavailable("overloaded")));

        let err = handler().handle(command(&upstream)).await.err().unwrap();

        assert!(matches!(err, ChatError::Upstream(UpstreamError::Unavailable { .. })));
        assert_eq!(upstream.calls_to(MockOperation::CreateConversation), 1);
        assert_eq!(upstream.list_conversations("org-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_org_is_rejected_locally() {
        let upstream = MockUpstream::new();
        let mut cmd = command(&upstream);
        cmd.org_id = " ".to_string();

        let err = handler().handle(cmd).await.err().unwrap();

        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(upstream.call_count(), 0);
    }
}
