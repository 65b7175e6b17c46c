//! Session Store Port - where logged-in sessions live between requests.
//!
//! Sessions are keyed by their raw session key, which callers present as a
//! bearer token. Nothing is persisted; a restart logs everyone out.

use async_trait::async_trait;
use std::sync::Arc;

use super::SessionContext;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a session, replacing any previous one with the same key.
    async fn put(&self, context: Arc<SessionContext>);

    /// Looks up the session for a key.
    ///
    /// Expired sessions are still returned; the caller decides whether to
    /// [`remove`](Self::remove) them.
    async fn get(&self, session_key: &str) -> Option<Arc<SessionContext>>;

    /// Drops a session. Returns false if none was stored.
    async fn remove(&self, session_key: &str) -> bool;
}
