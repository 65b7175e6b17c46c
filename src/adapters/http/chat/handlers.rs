//! HTTP handlers for chat endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireSession;
use crate::application::{
    CreateConversationCommand, CreateConversationHandler, CreateProjectCommand,
    CreateProjectHandler, DeleteConversationsCommand,
    DeleteConversationsHandler, GetConversationHandler, GetConversationQuery,
    ListConversationsHandler, ListConversationsQuery, ListOrganizationsHandler,
    ListOrganizationsQuery, ListProjectsHandler, ListProjectsQuery, QuickChatCommand,
    QuickChatHandler, RelayCommand, StreamRelay,
};
use crate::domain::chat::ConversationRef;

use super::dto::{CreateChatRequest, CreateProjectRequest, ProjectsQuery, SendMessageRequest};
use super::streaming::sse_response;

/// Response header naming the conversation a quick chat created.
pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ChatHandlers {
    organizations: Arc<ListOrganizationsHandler>,
    projects: Arc<ListProjectsHandler>,
    create_project: Arc<CreateProjectHandler>,
    create: Arc<CreateConversationHandler>,
    list: Arc<ListConversationsHandler>,
    get: Arc<GetConversationHandler>,
    delete: Arc<DeleteConversationsHandler>,
    relay: Arc<StreamRelay>,
    quick_chat: Arc<QuickChatHandler>,
}

impl ChatHandlers {
    pub fn new(relay: Arc<StreamRelay>) -> Self {
        Self {
            organizations: Arc::new(ListOrganizationsHandler::new()),
            projects: Arc::new(ListProjectsHandler::new()),
            create_project: Arc::new(CreateProjectHandler::new()),
            create: Arc::new(CreateConversationHandler::new()),
            list: Arc::new(ListConversationsHandler::new()),
            get: Arc::new(GetConversationHandler::new()),
            delete: Arc::new(DeleteConversationsHandler::new()),
            quick_chat: Arc::new(QuickChatHandler::new(Arc::clone(&relay))),
            relay,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Organizations
// ════════════════════════════════════════════════════════════════════════════

/// GET /organizations
pub async fn list_organizations(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
) -> Result<impl IntoResponse, ApiError> {
    let organizations = handlers
        .organizations
        .handle(ListOrganizationsQuery { session })
        .await?;
    Ok(Json(organizations))
}

/// GET /organizations/:org/projects
pub async fn list_projects(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
    Path(org_id): Path<String>,
    Query(params): Query<ProjectsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = handlers
        .projects
        .handle(ListProjectsQuery {
            session,
            org_id,
            include_archived: params.include_archived,
        })
        .await?;
    Ok(Json(projects))
}

/// POST /organizations/:org/projects
pub async fn create_project(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
    Path(org_id): Path<String>,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let project = handlers
        .create_project
        .handle(CreateProjectCommand {
            session,
            org_id,
            name: req.name,
            description: req.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

// ════════════════════════════════════════════════════════════════════════════
// Conversations
// ════════════════════════════════════════════════════════════════════════════

/// POST /organizations/:org/chats
pub async fn create_chat(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
    Path(org_id): Path<String>,
    body: Result<Json<CreateChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let conversation = handlers
        .create
        .handle(CreateConversationCommand {
            session,
            org_id,
            name: req.chat_name,
            project_uuid: req.project_uuid,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /organizations/:org/chats
pub async fn list_chats(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
    Path(org_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = handlers
        .list
        .handle(ListConversationsQuery { session, org_id })
        .await?;
    Ok(Json(conversations))
}

/// GET /organizations/:org/chats/:id
pub async fn get_chat(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
    Path((org_id, conversation_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = handlers
        .get
        .handle(GetConversationQuery {
            session,
            org_id,
            conversation_id,
        })
        .await?;
    Ok(Json(conversation))
}

/// DELETE /organizations/:org/chats
pub async fn delete_chats(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
    Path(org_id): Path<String>,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(conversation_ids) = body?;
    let ack = handlers
        .delete
        .handle(DeleteConversationsCommand {
            session,
            org_id,
            conversation_ids,
        })
        .await?;
    Ok(Json(ack))
}

// ════════════════════════════════════════════════════════════════════════════
// Streaming
// ════════════════════════════════════════════════════════════════════════════

/// POST /organizations/:org/chats/:id/messages
pub async fn send_message(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
    Path((org_id, conversation_id)): Path<(String, String)>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let prompt = req.into_prompt()?;
    let conversation = ConversationRef::new(org_id, conversation_id)?;

    let events = handlers
        .relay
        .handle(RelayCommand {
            session,
            conversation,
            prompt,
        })
        .await?;
    Ok(sse_response(events).into_response())
}

/// POST /organizations/:org/chat - Create a conversation and stream the first reply
pub async fn quick_chat(
    State(handlers): State<ChatHandlers>,
    RequireSession(session): RequireSession,
    Path(org_id): Path<String>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let prompt = req.into_prompt()?;

    let result = handlers
        .quick_chat
        .handle(QuickChatCommand {
            session,
            org_id,
            prompt,
        })
        .await?;

    let mut response = sse_response(result.events).into_response();
    if let Ok(value) = HeaderValue::from_str(&result.conversation.uuid) {
        response.headers_mut().insert(CONVERSATION_ID_HEADER, value);
    }
    Ok(response)
}
