use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, Collection, RecordId, Resource, Validate};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id", alias = "id")]
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub is_all_day: bool,
}

impl EventDraft {
    /// A timed event with no description, location or participants.
    pub fn new(title: impl Into<String>, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start_date,
            end_date,
            location: String::new(),
            participants: Vec::new(),
            is_all_day: false,
        }
    }

    /// Replace the participants from comma-separated form input.
    pub fn set_participants_input(&mut self, input: &str) {
        self.participants = parse_participants(input);
    }

    /// The participants as they appear in the form input.
    pub fn participants_input(&self) -> String {
        format_participants(&self.participants)
    }
}

/// All-day events are compared by calendar day in UTC, not the local day.
impl Validate for EventDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "Title")?;
        if self.is_all_day {
            if self.end_date.date_naive() < self.start_date.date_naive() {
                return Err(ValidationError::EndDateBeforeStartDate);
            }
        } else if self.end_date < self.start_date {
            return Err(ValidationError::EndTimeBeforeStartTime);
        }
        Ok(())
    }
}

impl Resource for Event {
    type Draft = EventDraft;
    const COLLECTION: Collection = Collection::Events;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn to_draft(&self) -> EventDraft {
        EventDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location.clone(),
            participants: self.participants.clone(),
            is_all_day: self.is_all_day,
        }
    }
}

/// Split comma-separated participant input into trimmed, non-empty entries.
pub fn parse_participants(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn format_participants(participants: &[String]) -> String {
    participants.join(", ")
}
