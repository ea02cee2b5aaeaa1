//! Domain records for the four collections and their editable drafts.
//!
//! # Design
//! Each collection has a server record type (with the server-assigned `_id`)
//! and a draft type holding exactly the user-editable fields. Drafts are what
//! create and update calls send; they validate themselves before any request
//! is built. Records convert back into drafts for edit forms.

mod event;
mod note;
mod reminder;
mod todo;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use event::{format_participants, parse_participants, Event, EventDraft};
pub use note::{Note, NoteColor, NoteDraft, TagSet};
pub use reminder::{Reminder, ReminderDraft, Repeat};
pub use todo::{Todo, TodoDraft};

/// Server-assigned record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The four independent resource collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Todos,
    Notes,
    Events,
    Reminders,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Todos,
        Collection::Notes,
        Collection::Events,
        Collection::Reminders,
    ];

    /// Path segment under the API base, also used as the cache query name.
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Todos => "todos",
            Collection::Notes => "notes",
            Collection::Events => "events",
            Collection::Reminders => "reminders",
        }
    }

    /// Name of one record, as used in user-facing fallback messages.
    pub fn singular(&self) -> &'static str {
        match self {
            Collection::Todos => "todo",
            Collection::Notes => "note",
            Collection::Events => "event",
            Collection::Reminders => "reminder",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Completion state shared by todos and reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

impl Status {
    pub fn toggled(self) -> Self {
        match self {
            Status::Pending => Status::Completed,
            Status::Completed => Status::Pending,
        }
    }

    pub fn is_completed(self) -> bool {
        self == Status::Completed
    }
}

/// Local validation run before a draft is sent.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// A record type stored in one of the collections.
pub trait Resource:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// User-editable fields, sent as the body of create and update calls.
    type Draft: Validate + Serialize + Clone + fmt::Debug + Send + Sync + 'static;

    const COLLECTION: Collection;

    fn id(&self) -> &RecordId;

    /// The edit-form state for this record.
    fn to_draft(&self) -> Self::Draft;
}

pub(crate) fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}
