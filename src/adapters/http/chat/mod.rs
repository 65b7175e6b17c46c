//! Chat endpoints: organizations, conversations, and streamed replies.

mod dto;
mod handlers;
mod routes;
mod streaming;

pub use dto::{CreateChatRequest, CreateProjectRequest, ProjectsQuery, SendMessageRequest};
pub use handlers::{ChatHandlers, CONVERSATION_ID_HEADER};
pub use routes::chat_routes;
pub use streaming::{sse_response, to_sse_event};
