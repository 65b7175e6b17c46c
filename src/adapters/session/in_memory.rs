//! In-memory session store.
//!
//! Logged-in sessions live in a `tokio::sync::RwLock<HashMap>` keyed by the
//! raw session key. Reads vastly outnumber writes (one write per login, one
//! read per request).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{SessionContext, SessionStore};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionContext>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, context: Arc<SessionContext>) {
        let key = context.credential().expose_key().to_string();
        self.sessions.write().await.insert(key, context);
    }

    async fn get(&self, session_key: &str) -> Option<Arc<SessionContext>> {
        self.sessions.read().await.get(session_key).cloned()
    }

    async fn remove(&self, session_key: &str) -> bool {
        self.sessions.write().await.remove(session_key).is_some()
    }
}
