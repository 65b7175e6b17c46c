//! Streaming relay handlers.

mod quick_chat;
mod stream_relay;

pub use quick_chat::{QuickChatCommand, QuickChatHandler, QuickChatResult};
pub use stream_relay::{EventStream, RelayCommand, RelaySettings, StreamRelay};
