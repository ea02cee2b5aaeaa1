use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, Collection, Priority, RecordId, Resource, Status, Validate};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    #[serde(rename = "_id", alias = "id")]
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    #[serde(default)]
    pub repeat: Repeat,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or fully updating a reminder.
///
/// `status` travels with every update so editing a completed reminder does
/// not reopen it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDraft {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub repeat: Repeat,
    pub status: Status,
}

impl ReminderDraft {
    /// A pending, non-repeating, low-priority reminder.
    pub fn new(title: impl Into<String>, description: impl Into<String>, due_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            due_date,
            priority: Priority::Low,
            repeat: Repeat::None,
            status: Status::Pending,
        }
    }

    /// Trim the free-text fields the way the form submits them.
    pub fn trimmed(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self
    }
}

impl Validate for ReminderDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "Title")?;
        require(&self.description, "Description")
    }
}

impl Reminder {
    pub fn toggled_draft(&self) -> ReminderDraft {
        ReminderDraft {
            status: self.status.toggled(),
            ..self.to_draft()
        }
    }
}

impl Resource for Reminder {
    type Draft = ReminderDraft;
    const COLLECTION: Collection = Collection::Reminders;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn to_draft(&self) -> ReminderDraft {
        ReminderDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            priority: self.priority,
            repeat: self.repeat,
            status: self.status,
        }
    }
}
