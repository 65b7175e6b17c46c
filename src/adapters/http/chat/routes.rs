//! HTTP routes for chat endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_chat, create_project, delete_chats, get_chat, list_chats, list_organizations, list_projects,
    quick_chat, send_message, ChatHandlers,
};

/// Creates the chat router. Callers add the session layer.
pub fn chat_routes(handlers: ChatHandlers) -> Router {
    Router::new()
        .route("/organizations", get(list_organizations))
        .route(
            "/organizations/:org/projects",
            get(list_projects).post(create_project),
        )
        .route(
            "/organizations/:org/chats",
            post(create_chat).get(list_chats).delete(delete_chats),
        )
        .route("/organizations/:org/chats/:id", get(get_chat))
        .route("/organizations/:org/chats/:id/messages", post(send_message))
        .route("/organizations/:org/chat", post(quick_chat))
        .with_state(handlers)
}
