use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{require, Collection, RecordId, Resource, Validate};
use crate::error::ValidationError;

/// The fixed note palette. `Default` means "no color".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteColor {
    #[default]
    Default,
    Blue,
    Green,
    Orange,
    Red,
    Purple,
    Yellow,
}

impl NoteColor {
    pub const PALETTE: [NoteColor; 7] = [
        NoteColor::Default,
        NoteColor::Blue,
        NoteColor::Green,
        NoteColor::Orange,
        NoteColor::Red,
        NoteColor::Purple,
        NoteColor::Yellow,
    ];

    pub fn hex(&self) -> &'static str {
        match self {
            NoteColor::Default => "#FFFFFF",
            NoteColor::Blue => "#90CAF9",
            NoteColor::Green => "#A5D6A7",
            NoteColor::Orange => "#FFCC80",
            NoteColor::Red => "#EF9A9A",
            NoteColor::Purple => "#CE93D8",
            NoteColor::Yellow => "#FFF59D",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NoteColor::Default => "Default",
            NoteColor::Blue => "Blue",
            NoteColor::Green => "Green",
            NoteColor::Orange => "Orange",
            NoteColor::Red => "Red",
            NoteColor::Purple => "Purple",
            NoteColor::Yellow => "Yellow",
        }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        Self::PALETTE
            .into_iter()
            .find(|color| color.hex().eq_ignore_ascii_case(hex.trim()))
    }
}

impl Serialize for NoteColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.hex())
    }
}

impl<'de> Deserialize<'de> for NoteColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(NoteColor::from_hex(&raw).unwrap_or_else(|| {
            tracing::warn!(color = %raw, "note color outside the palette, using default");
            NoteColor::Default
        }))
    }
}

/// Note tags: insertion-ordered, no exact duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the trimmed tag text. Returns false when the text is blank or
    /// already present (case-sensitive).
    pub fn add(&mut self, input: &str) -> bool {
        let tag = input.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(raw.iter().map(String::as_str).collect())
    }
}

impl<'a> FromIterator<&'a str> for TagSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        for tag in iter {
            tags.add(tag);
        }
        tags
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "_id", alias = "id")]
    pub id: RecordId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub color: NoteColor,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub color: NoteColor,
    #[serde(default)]
    pub tags: TagSet,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

impl Validate for NoteDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "Title")?;
        require(&self.content, "Content")
    }
}

impl Resource for Note {
    type Draft = NoteDraft;
    const COLLECTION: Collection = Collection::Notes;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            color: self.color,
            tags: self.tags.clone(),
        }
    }
}
