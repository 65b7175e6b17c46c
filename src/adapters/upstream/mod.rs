//! Upstream Adapters.
//!
//! Implementations of the `UpstreamProvider` port.
//!
//! - `ClaudeAiConnector` / `ClaudeAiUpstream` - claude.ai web API over reqwest
//! - `MockConnector` / `MockUpstream` - scripted in-process upstream for tests

mod claude_ai;
mod mock;

pub use claude_ai::{ClaudeAiConnector, ClaudeAiSettings, ClaudeAiUpstream};
pub use mock::{MockCall, MockConnector, MockOperation, MockReply, MockStep, MockUpstream};
