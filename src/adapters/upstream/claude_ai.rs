//! claude.ai web API adapter.
//!
//! Implements the `UpstreamProvider` port against the browser-facing
//! claude.ai API, authenticating with the `sessionKey` cookie.
//!
//! Non-streaming calls carry a per-request timeout. The completion call does
//! not: how long a reply may stream is decided by the relay, which drops the
//! stream (and with it the connection) when its own limits are hit.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{future, StreamExt};
use reqwest::{header, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::UpstreamConfig;
use crate::domain::chat::{
    ChatPrompt, Conversation, ConversationRef, ConversationSummary, Organization, Project,
    UpstreamUnit, DONE_SENTINEL,
};
use crate::domain::session::SessionCredential;
use crate::ports::{
    NewConversation, NewProject, UnitStream, UpstreamConnector, UpstreamError, UpstreamProvider,
};

/// Capability an organization needs to be listed.
const CHAT_CAPABILITY: &str = "chat";

/// Settings shared by every session bound through one connector.
#[derive(Debug, Clone)]
pub struct ClaudeAiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl From<&UpstreamConfig> for ClaudeAiSettings {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Builds one HTTP client and binds it to credentials on demand.
#[derive(Debug, Clone)]
pub struct ClaudeAiConnector {
    client: Client,
    settings: Arc<ClaudeAiSettings>,
}

impl ClaudeAiConnector {
    pub fn new(settings: ClaudeAiSettings) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| UpstreamError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }
}

impl UpstreamConnector for ClaudeAiConnector {
    fn connect(
        &self,
        credential: &SessionCredential,
    ) -> Result<Arc<dyn UpstreamProvider>, UpstreamError> {
        Ok(Arc::new(ClaudeAiUpstream {
            client: self.client.clone(),
            settings: Arc::clone(&self.settings),
            cookie: Secret::new(format!("sessionKey={}", credential.expose_key())),
        }))
    }
}

/// One claude.ai session.
pub struct ClaudeAiUpstream {
    client: Client,
    settings: Arc<ClaudeAiSettings>,
    cookie: Secret<String>,
}

impl ClaudeAiUpstream {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    fn conversations_path(org_id: &str) -> String {
        format!("/organizations/{}/chat_conversations", org_id)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header(header::COOKIE, self.cookie.expose_secret())
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(header::COOKIE, self.cookie.expose_secret())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, UpstreamError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::timeout(self.settings.request_timeout.as_secs())
            } else if e.is_connect() {
                UpstreamError::network(format!("Connection failed: {}", e))
            } else {
                UpstreamError::network(e.to_string())
            }
        })?;
        check_status(response).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, UpstreamError> {
        let response = self
            .send(request.timeout(self.settings.request_timeout))
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::parse(format!("Failed to parse response: {}", e)))
    }
}

async fn check_status(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "upstream returned error status");
    Err(UpstreamError::from_status(status.as_u16(), body))
}

#[derive(Debug, Deserialize)]
struct OrganizationWire {
    uuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    capabilities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectWire {
    uuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    archived_at: Option<String>,
}

impl From<ProjectWire> for Project {
    fn from(wire: ProjectWire) -> Self {
        Project {
            id: wire.uuid,
            name: wire.name,
            archived_at: wire.archived_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateProjectWire<'a> {
    name: &'a str,
    description: &'a str,
    is_private: bool,
}

#[derive(Debug, Serialize)]
struct CreateConversationWire<'a> {
    uuid: String,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_uuid: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteManyWire<'a> {
    conversation_uuids: &'a [String],
}

#[derive(Debug, Serialize)]
struct CompletionWire<'a> {
    prompt: &'a str,
    timezone: &'a str,
    attachments: Vec<Value>,
    files: Vec<Value>,
}

fn chat_organizations(wire: Vec<OrganizationWire>) -> Vec<Organization> {
    wire.into_iter()
        .filter(|org| org.capabilities.iter().any(|c| c == CHAT_CAPABILITY))
        .map(|org| Organization::new(org.uuid, org.name))
        .collect()
}

fn visible_projects(wire: Vec<ProjectWire>, include_archived: bool) -> Vec<Project> {
    wire.into_iter()
        .filter(|p| include_archived || p.archived_at.is_none())
        .map(Project::from)
        .collect()
}

/// Turns one upstream SSE payload into a unit, an in-band failure, or nothing.
fn classify(data: &str) -> Option<Result<UpstreamUnit, UpstreamError>> {
    // The relay appends its own terminator.
    if data.trim() == DONE_SENTINEL {
        return None;
    }
    let unit = UpstreamUnit::from_data(data)?;
    match unit.error_message() {
        Some(message) => Some(Err(UpstreamError::stream(message))),
        None => Some(Ok(unit)),
    }
}

#[async_trait]
impl UpstreamProvider for ClaudeAiUpstream {
    #[instrument(skip(self))]
    async fn list_organizations(&self) -> Result<Vec<Organization>, UpstreamError> {
        let wire: Vec<OrganizationWire> = self.fetch_json(self.get("/organizations")).await?;
        let organizations = chat_organizations(wire);
        debug!(count = organizations.len(), "listed organizations");
        Ok(organizations)
    }

    #[instrument(skip(self))]
    async fn list_projects(
        &self,
        org_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Project>, UpstreamError> {
        let mut request = self.get(&format!("/organizations/{}/projects", org_id));
        if include_archived {
            request = request.query(&[("include_archived", "true")]);
        }
        let wire: Vec<ProjectWire> = self.fetch_json(request).await?;
        Ok(visible_projects(wire, include_archived))
    }

    #[instrument(skip(self, request))]
    async fn create_project(
        &self,
        org_id: &str,
        request: NewProject,
    ) -> Result<Project, UpstreamError> {
        let body = CreateProjectWire {
            name: &request.name,
            description: &request.description,
            is_private: true,
        };
        let wire: ProjectWire = self
            .fetch_json(self.post(&format!("/organizations/{}/projects", org_id)).json(&body))
            .await?;
        debug!(project = %wire.uuid, "created project");
        Ok(wire.into())
    }

    #[instrument(skip(self, request), fields(project = ?request.project_uuid))]
    async fn create_conversation(
        &self,
        org_id: &str,
        request: NewConversation,
    ) -> Result<Conversation, UpstreamError> {
        let body = CreateConversationWire {
            uuid: uuid::Uuid::new_v4().to_string(),
            name: &request.name,
            project_uuid: request.project_uuid.as_deref(),
        };
        self.fetch_json(self.post(&Self::conversations_path(org_id)).json(&body))
            .await
    }

    #[instrument(skip(self))]
    async fn list_conversations(
        &self,
        org_id: &str,
    ) -> Result<Vec<ConversationSummary>, UpstreamError> {
        self.fetch_json(self.get(&Self::conversations_path(org_id)))
            .await
    }

    #[instrument(skip(self), fields(org = conversation.org_id(), conversation = conversation.conversation_id()))]
    async fn get_conversation(
        &self,
        conversation: &ConversationRef,
    ) -> Result<Conversation, UpstreamError> {
        let path = format!(
            "{}/{}",
            Self::conversations_path(conversation.org_id()),
            conversation.conversation_id()
        );
        self.fetch_json(self.get(&path).query(&[("rendering_mode", "raw")]))
            .await
    }

    #[instrument(skip(self, conversation_ids), fields(count = conversation_ids.len()))]
    async fn delete_conversations(
        &self,
        org_id: &str,
        conversation_ids: &[String],
    ) -> Result<Value, UpstreamError> {
        let path = format!("{}/delete_many", Self::conversations_path(org_id));
        let body = DeleteManyWire {
            conversation_uuids: conversation_ids,
        };
        let response = self
            .send(
                self.post(&path)
                    .json(&body)
                    .timeout(self.settings.request_timeout),
            )
            .await?;
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::network(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    #[instrument(skip(self, prompt), fields(org = conversation.org_id(), conversation = conversation.conversation_id()))]
    async fn stream_reply(
        &self,
        conversation: &ConversationRef,
        prompt: &ChatPrompt,
    ) -> Result<UnitStream, UpstreamError> {
        let path = format!(
            "{}/{}/completion",
            Self::conversations_path(conversation.org_id()),
            conversation.conversation_id()
        );
        let body = CompletionWire {
            prompt: prompt.text(),
            timezone: prompt.timezone(),
            attachments: Vec::new(),
            files: Vec::new(),
        };
        let response = self
            .send(
                self.post(&path)
                    .header(header::ACCEPT, "text/event-stream")
                    .json(&body),
            )
            .await?;

        let units = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| {
                future::ready(match event {
                    Ok(event) => classify(&event.data),
                    Err(e) => Some(Err(UpstreamError::network(format!("Stream error: {}", e)))),
                })
            });

        Ok(Box::pin(units))
    }
}
