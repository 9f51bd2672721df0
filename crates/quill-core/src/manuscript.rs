//! Manuscript and chapter data model
//!
//! A manuscript owns an ordered list of chapters. The list is persisted as a
//! single JSON blob (`{"chapters": [...]}`) on the manuscript record, so the
//! order of the vector *is* the authorial order of the book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Editorial status of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    #[default]
    Draft,
    Revision,
    Final,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::Draft => "draft",
            ChapterStatus::Revision => "revision",
            ChapterStatus::Final => "final",
        }
    }
}

impl std::fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form notes, tags and status attached to a chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChapterStatus>,
}

impl ChapterMetadata {
    /// Status, falling back to `draft` when none was chosen.
    pub fn status_or_default(&self) -> ChapterStatus {
        self.status.unwrap_or_default()
    }

    /// Add a tag. Blank tags are ignored; returns whether the tag was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove every occurrence of a tag.
    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }
}

/// A titled unit of narrative content. `content` is HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Client-assigned id, unique within its manuscript only
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChapterMetadata>,
}

impl Chapter {
    /// A chapter with the default `Chapter {id}` title and no content.
    pub fn numbered(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: format!("Chapter {}", id),
            id,
            content: String::new(),
            metadata: None,
        }
    }

    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            metadata: None,
        }
    }
}

/// The JSON shape stored in the manuscript's content column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptContent {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

impl ManuscriptContent {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters }
    }

    /// Parse a stored content blob. Anything without a `chapters` array yields
    /// an empty list rather than an error.
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "chapters": self.chapters })
    }
}

/// Top-level document owned by one user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a manuscript from the library view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewManuscript {
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewManuscript {
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::required("title", "Title is required"));
        }
        if self.owner_id.trim().is_empty() {
            return Err(ValidationError::required("owner_id", "An owner is required"));
        }
        Ok(())
    }

    /// Build the stored record. New manuscripts start with a single empty chapter.
    pub fn into_manuscript(self, now: DateTime<Utc>) -> Manuscript {
        Manuscript {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            chapters: vec![Chapter::numbered("1")],
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_json_shape() {
        let content = ManuscriptContent::new(vec![Chapter::new("1", "Chapter 1", "<p>Hello</p>")]);
        let value = content.to_value();
        assert_eq!(value["chapters"][0]["id"], "1");
        assert_eq!(value["chapters"][0]["content"], "<p>Hello</p>");
        assert!(value["chapters"][0].get("metadata").is_none());
    }

    #[test]
    fn test_content_tolerates_foreign_blobs() {
        let parsed = ManuscriptContent::from_value(&serde_json::json!({ "text": "legacy" }));
        assert!(parsed.chapters.is_empty());

        let parsed = ManuscriptContent::from_value(&serde_json::Value::Null);
        assert!(parsed.chapters.is_empty());
    }

    #[test]
    fn test_metadata_status_serializes_lowercase() {
        let meta = ChapterMetadata {
            notes: Some("tighten the ending".into()),
            tags: vec!["act-one".into()],
            status: Some(ChapterStatus::Revision),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["status"], "revision");
        assert_eq!(ChapterMetadata::default().status_or_default(), ChapterStatus::Draft);
    }

    #[test]
    fn test_metadata_tags() {
        let mut meta = ChapterMetadata::default();
        assert!(!meta.add_tag("   "));
        assert!(meta.add_tag(" flashback "));
        assert!(meta.add_tag("villain"));
        meta.remove_tag("flashback");
        assert_eq!(meta.tags, vec!["villain".to_string()]);
    }

    #[test]
    fn test_new_manuscript_validation() {
        assert!(NewManuscript::new("user-1", "  ").validate().is_err());
        assert!(NewManuscript::new("", "Title").validate().is_err());

        let ms = NewManuscript::new("user-1", " The Long Night ")
            .with_description("")
            .into_manuscript(Utc::now());
        assert_eq!(ms.title, "The Long Night");
        assert!(ms.description.is_none());
        assert_eq!(ms.chapters, vec![Chapter::numbered("1")]);
    }
}
