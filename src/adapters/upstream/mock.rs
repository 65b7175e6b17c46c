//! Mock upstream for testing.
//!
//! An in-process stand-in for the conversational-AI backend so that the
//! relay and the HTTP layer can be exercised without network access.
//!
//! # Features
//!
//! - Scripted reply streams (units, mid-stream failures, delays, hangs)
//! - Per-operation error injection
//! - Call tracking for verification
//! - Stream release counting, to observe cancellation
//!
//! # Example
//!
//! ```ignore
//! let upstream = MockUpstream::new()
//!     .with_reply(MockReply::text(["Hi", " there"]))
//!     .with_operation_error(MockOperation::DeleteConversations, UpstreamError::unavailable("busy"));
//! ```

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::chat::{
    ChatPrompt, Conversation, ConversationRef, ConversationSummary, Organization, Project,
    UpstreamUnit,
};
use crate::domain::session::SessionCredential;
use crate::ports::{
    NewConversation, NewProject, UnitStream, UpstreamConnector, UpstreamError, UpstreamProvider,
};

/// One step of a scripted reply stream.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Yield a unit.
    Unit(UpstreamUnit),
    /// Yield an error.
    Fail(UpstreamError),
    /// Wait before the next step.
    Delay(Duration),
    /// Never yield again.
    Hang,
}

/// A scripted answer to `stream_reply`.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Connection accepted; the steps are played in order.
    Stream(Vec<MockStep>),
    /// Connection refused.
    Error(UpstreamError),
}

impl MockReply {
    /// Plain text fragments.
    pub fn text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockReply::Stream(
            fragments
                .into_iter()
                .map(|f| MockStep::Unit(UpstreamUnit::Text(f.into())))
                .collect(),
        )
    }

    /// JSON records. Non-object values are ignored.
    pub fn records(records: Vec<Value>) -> Self {
        MockReply::Stream(
            records
                .into_iter()
                .filter_map(|record| match record {
                    Value::Object(map) => Some(MockStep::Unit(UpstreamUnit::Record(map))),
                    _ => None,
                })
                .collect(),
        )
    }

    pub fn steps(steps: Vec<MockStep>) -> Self {
        MockReply::Stream(steps)
    }
}

/// Upstream operations, for call tracking and error injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    ListOrganizations,
    ListProjects,
    CreateProject,
    CreateConversation,
    ListConversations,
    GetConversation,
    DeleteConversations,
    StreamReply,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListOrganizations,
    ListProjects {
        org_id: String,
        include_archived: bool,
    },
    CreateProject {
        org_id: String,
        name: String,
        description: String,
    },
    CreateConversation {
        org_id: String,
        name: String,
        project_uuid: Option<String>,
    },
    ListConversations {
        org_id: String,
    },
    GetConversation {
        org_id: String,
        conversation_id: String,
    },
    DeleteConversations {
        org_id: String,
        conversation_ids: Vec<String>,
    },
    StreamReply {
        org_id: String,
        conversation_id: String,
        prompt: String,
        timezone: String,
    },
}

impl MockCall {
    pub fn operation(&self) -> MockOperation {
        match self {
            MockCall::ListOrganizations => MockOperation::ListOrganizations,
            MockCall::ListProjects { .. } => MockOperation::ListProjects,
            MockCall::CreateProject { .. } => MockOperation::CreateProject,
            MockCall::CreateConversation { .. } => MockOperation::CreateConversation,
            MockCall::ListConversations { .. } => MockOperation::ListConversations,
            MockCall::GetConversation { .. } => MockOperation::GetConversation,
            MockCall::DeleteConversations { .. } => MockOperation::DeleteConversations,
            MockCall::StreamReply { .. } => MockOperation::StreamReply,
        }
    }
}

/// Mock upstream provider.
///
/// Clones share all state, so a test can keep one handle for assertions
/// while the application holds another.
#[derive(Debug, Clone)]
pub struct MockUpstream {
    organizations: Arc<Mutex<Vec<Organization>>>,
    projects: Arc<Mutex<Vec<Project>>>,
    conversations: Arc<Mutex<HashMap<String, Vec<Conversation>>>>,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    errors: Arc<Mutex<HashMap<MockOperation, UpstreamError>>>,
    delete_ack: Arc<Mutex<Option<Value>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    released_streams: Arc<AtomicUsize>,
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUpstream {
    /// One organization, no projects, no conversations.
    pub fn new() -> Self {
        Self {
            organizations: Arc::new(Mutex::new(vec![Organization::new("org-1", "Test Org")])),
            projects: Arc::new(Mutex::new(Vec::new())),
            conversations: Arc::new(Mutex::new(HashMap::new())),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            errors: Arc::new(Mutex::new(HashMap::new())),
            delete_ack: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            released_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_organizations(self, organizations: Vec<Organization>) -> Self {
        *self.organizations.lock().unwrap() = organizations;
        self
    }

    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        *self.projects.lock().unwrap() = projects;
        self
    }

    pub fn with_conversation(self, org_id: impl Into<String>, conversation: Conversation) -> Self {
        self.conversations
            .lock()
            .unwrap()
            .entry(org_id.into())
            .or_default()
            .push(conversation);
        self
    }

    /// Queues a reply for the next `stream_reply` call.
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Makes every call of `operation` fail with `error`.
    pub fn with_operation_error(self, operation: MockOperation, error: UpstreamError) -> Self {
        self.errors.lock().unwrap().insert(operation, error);
        self
    }

    /// Acknowledgement returned by `delete_conversations`.
    pub fn with_delete_ack(self, ack: Value) -> Self {
        *self.delete_ack.lock().unwrap() = Some(ack);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, operation: MockOperation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Reply streams that have been exhausted or dropped.
    pub fn released_streams(&self) -> usize {
        self.released_streams.load(Ordering::SeqCst)
    }

    fn record(&self, call: MockCall) -> Result<(), UpstreamError> {
        let operation = call.operation();
        self.calls.lock().unwrap().push(call);
        match self.errors.lock().unwrap().get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::text(["Mock reply"]))
    }
}

/// Counts a reply stream as released when it is dropped.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn play(steps: Vec<MockStep>, guard: ReleaseGuard) -> UnitStream {
    let state = (VecDeque::from(steps), guard);
    Box::pin(stream::unfold(state, |(mut steps, guard)| async move {
        loop {
            match steps.pop_front()? {
                MockStep::Unit(unit) => return Some((Ok(unit), (steps, guard))),
                MockStep::Fail(err) => return Some((Err(err), (steps, guard))),
                MockStep::Delay(duration) => sleep(duration).await,
                MockStep::Hang => futures::future::pending::<()>().await,
            }
        }
    }))
}

#[async_trait]
impl UpstreamProvider for MockUpstream {
    async fn list_organizations(&self) -> Result<Vec<Organization>, UpstreamError> {
        self.record(MockCall::ListOrganizations)?;
        Ok(self.organizations.lock().unwrap().clone())
    }

    async fn list_projects(
        &self,
        org_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Project>, UpstreamError> {
        self.record(MockCall::ListProjects {
            org_id: org_id.to_string(),
            include_archived,
        })?;
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| include_archived || !p.is_archived())
            .cloned()
            .collect())
    }

    async fn create_project(
        &self,
        org_id: &str,
        request: NewProject,
    ) -> Result<Project, UpstreamError> {
        self.record(MockCall::CreateProject {
            org_id: org_id.to_string(),
            name: request.name.clone(),
            description: request.description,
        })?;
        let project = Project::new(uuid::Uuid::new_v4().to_string(), request.name);
        self.projects.lock().unwrap().push(project.clone());
        Ok(project)
    }

    async fn create_conversation(
        &self,
        org_id: &str,
        request: NewConversation,
    ) -> Result<Conversation, UpstreamError> {
        self.record(MockCall::CreateConversation {
            org_id: org_id.to_string(),
            name: request.name.clone(),
            project_uuid: request.project_uuid.clone(),
        })?;
        let conversation = Conversation::new(
            uuid::Uuid::new_v4().to_string(),
            request.name,
            request.project_uuid,
        );
        self.conversations
            .lock()
            .unwrap()
            .entry(org_id.to_string())
            .or_default()
            .push(conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(
        &self,
        org_id: &str,
    ) -> Result<Vec<ConversationSummary>, UpstreamError> {
        self.record(MockCall::ListConversations {
            org_id: org_id.to_string(),
        })?;
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .get(org_id)
            .map(|list| list.iter().map(Conversation::summary).collect())
            .unwrap_or_default())
    }

    async fn get_conversation(
        &self,
        conversation: &ConversationRef,
    ) -> Result<Conversation, UpstreamError> {
        self.record(MockCall::GetConversation {
            org_id: conversation.org_id().to_string(),
            conversation_id: conversation.conversation_id().to_string(),
        })?;
        self.conversations
            .lock()
            .unwrap()
            .get(conversation.org_id())
            .and_then(|list| {
                list.iter()
                    .find(|c| c.uuid == conversation.conversation_id())
                    .cloned()
            })
            .ok_or_else(|| UpstreamError::not_found(conversation.conversation_id()))
    }

    async fn delete_conversations(
        &self,
        org_id: &str,
        conversation_ids: &[String],
    ) -> Result<Value, UpstreamError> {
        self.record(MockCall::DeleteConversations {
            org_id: org_id.to_string(),
            conversation_ids: conversation_ids.to_vec(),
        })?;
        let doomed: HashSet<&String> = conversation_ids.iter().collect();
        if let Some(list) = self.conversations.lock().unwrap().get_mut(org_id) {
            list.retain(|c| !doomed.contains(&c.uuid));
        }
        let ack = self.delete_ack.lock().unwrap().clone();
        Ok(ack.unwrap_or_else(|| {
            let mut body = Map::new();
            body.insert("deleted".to_string(), json!(conversation_ids));
            Value::Object(body)
        }))
    }

    async fn stream_reply(
        &self,
        conversation: &ConversationRef,
        prompt: &ChatPrompt,
    ) -> Result<UnitStream, UpstreamError> {
        self.record(MockCall::StreamReply {
            org_id: conversation.org_id().to_string(),
            conversation_id: conversation.conversation_id().to_string(),
            prompt: prompt.text().to_string(),
            timezone: prompt.timezone().to_string(),
        })?;
        match self.next_reply() {
            MockReply::Stream(steps) => {
                Ok(play(steps, ReleaseGuard(Arc::clone(&self.released_streams))))
            }
            MockReply::Error(err) => Err(err),
        }
    }
}

/// Connector handing out one shared [`MockUpstream`] to every credential.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    upstream: MockUpstream,
    connected: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new(upstream: MockUpstream) -> Self {
        Self {
            upstream,
            connected: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn upstream(&self) -> &MockUpstream {
        &self.upstream
    }

    /// Credentials bound so far, as fingerprints.
    pub fn connected(&self) -> Vec<String> {
        self.connected.lock().unwrap().clone()
    }
}

impl UpstreamConnector for MockConnector {
    fn connect(
        &self,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn UpstreamProvider>, UpstreamError> {
        self.connected.lock().unwrap().push(credential.fingerprint());
        Ok(Arc::new(self.upstream.clone()))
    }
}
