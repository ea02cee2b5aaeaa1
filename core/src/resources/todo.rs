use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, Collection, Priority, RecordId, Resource, Status, Validate};
use crate::error::ValidationError;

/// A single todo item returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(rename = "_id", alias = "id")]
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or fully updating a todo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub status: Status,
}

impl TodoDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Default for TodoDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: Priority::Medium,
            status: Status::Pending,
        }
    }
}

impl Validate for TodoDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "Title")
    }
}

impl Todo {
    /// The full update that flips this todo between pending and completed.
    pub fn toggled_draft(&self) -> TodoDraft {
        TodoDraft {
            status: self.status.toggled(),
            ..self.to_draft()
        }
    }
}

impl Resource for Todo {
    type Draft = TodoDraft;
    const COLLECTION: Collection = Collection::Todos;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn to_draft(&self) -> TodoDraft {
        TodoDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            status: self.status,
        }
    }
}
