//! Organization and project read models.

use serde::{Deserialize, Serialize};

/// Upstream tenant grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

impl Organization {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Optional grouping of chats within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            archived_at: None,
        }
    }

    pub fn archived(mut self, at: impl Into<String>) -> Self {
        self.archived_at = Some(at.into());
        self
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}
