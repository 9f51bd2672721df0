//! Story records: characters, locations, timeline events, plot points, conflicts
//!
//! Each kind is a flat record scoped to a manuscript. They share one storage
//! shape ([`StoredRecord`]: kind + JSON payload) and are lifted into typed
//! structs through the [`StoryRecord`] trait.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{QuillError, Result, StoreError, ValidationError};
use crate::store::{blocking, RecordStore};

/// The record tables that hang off a manuscript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Character,
    Location,
    TimelineEvent,
    PlotPoint,
    Conflict,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Character,
        RecordKind::Location,
        RecordKind::TimelineEvent,
        RecordKind::PlotPoint,
        RecordKind::Conflict,
    ];

    /// Table name, also used as the URL path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Character => "characters",
            RecordKind::Location => "locations",
            RecordKind::TimelineEvent => "timeline_events",
            RecordKind::PlotPoint => "plot_points",
            RecordKind::Conflict => "conflicts",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StoreError::Validation(format!("unknown record kind: {}", s)))
    }
}

/// Untyped row as kept by a [`RecordStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: Uuid,
    pub kind: RecordKind,
    pub manuscript_id: Uuid,
    pub payload: serde_json::Value,
    /// Secondary ordering key; list order is (sort_key, created_at)
    pub sort_key: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A typed record kind.
pub trait StoryRecord: Serialize + DeserializeOwned + Clone + Send + 'static {
    const KIND: RecordKind;

    /// Checked before any store call.
    fn validate(&self) -> std::result::Result<(), ValidationError>;

    fn sort_key(&self) -> i64 {
        0
    }
}

/// A typed record together with its row metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: Uuid,
    pub manuscript_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: T,
}

impl<T: StoryRecord> Record<T> {
    fn from_stored(stored: StoredRecord) -> std::result::Result<Self, StoreError> {
        if stored.kind != T::KIND {
            return Err(StoreError::Validation(format!(
                "expected a {} record, found {}",
                T::KIND,
                stored.kind
            )));
        }
        let data = serde_json::from_value(stored.payload)
            .map_err(|e| StoreError::Storage(format!("decode {}: {}", T::KIND, e)))?;
        Ok(Self {
            id: stored.id,
            manuscript_id: stored.manuscript_id,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            data,
        })
    }

    fn to_stored(&self) -> std::result::Result<StoredRecord, StoreError> {
        Ok(StoredRecord {
            id: self.id,
            kind: T::KIND,
            manuscript_id: self.manuscript_id,
            payload: serde_json::to_value(&self.data)
                .map_err(|e| StoreError::Storage(format!("encode {}: {}", T::KIND, e)))?,
            sort_key: self.data.sort_key(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn require(
    value: &str,
    field: &'static str,
    message: &'static str,
) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::required(field, message))
    } else {
        Ok(())
    }
}

// ============================================================================
// Record kinds
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub name: String,
    pub role: Option<String>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub background: Option<String>,
    pub notes: Option<String>,
    /// Free-form map of other character names to relationship labels
    pub relationships: Option<serde_json::Value>,
}

impl StoryRecord for Character {
    const KIND: RecordKind = RecordKind::Character;

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require(&self.name, "name", "Character name is required")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl StoryRecord for Location {
    const KIND: RecordKind = RecordKind::Location;

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require(&self.name, "name", "Location name is required")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineEvent {
    pub title: String,
    pub description: Option<String>,
    /// In-story date, free text
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub category: Option<String>,
}

impl StoryRecord for TimelineEvent {
    const KIND: RecordKind = RecordKind::TimelineEvent;

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require(&self.title, "title", "Event title is required")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotPoint {
    pub title: String,
    pub chapter_id: String,
    pub description: Option<String>,
    pub plot_type: Option<String>,
    /// 1 (calm) to 10 (climax)
    pub tension_level: Option<i64>,
    pub sequence_order: i64,
}

impl StoryRecord for PlotPoint {
    const KIND: RecordKind = RecordKind::PlotPoint;

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require(&self.title, "title", "Plot point title is required")?;
        require(&self.chapter_id, "chapter_id", "Please select a chapter")?;
        if let Some(level) = self.tension_level {
            if !(1..=10).contains(&level) {
                return Err(ValidationError::OutOfRange {
                    field: "tension_level",
                    min: 1,
                    max: 10,
                });
            }
        }
        Ok(())
    }

    fn sort_key(&self) -> i64 {
        self.sequence_order
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conflict {
    pub title: String,
    pub description: Option<String>,
    pub conflict_type: Option<String>,
    pub status: Option<String>,
    pub introduced_chapter: Option<String>,
    pub resolved_chapter: Option<String>,
    pub characters_involved: Vec<String>,
}

impl StoryRecord for Conflict {
    const KIND: RecordKind = RecordKind::Conflict;

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        require(&self.title, "title", "Conflict title is required")
    }
}

/// Validate an untyped payload against the rules of its kind.
pub fn validate_payload(kind: RecordKind, payload: &serde_json::Value) -> Result<()> {
    fn check<T: StoryRecord>(payload: &serde_json::Value) -> Result<()> {
        let data: T = serde_json::from_value(payload.clone())
            .map_err(|e| StoreError::Validation(format!("invalid {}: {}", T::KIND, e)))?;
        data.validate()?;
        Ok(())
    }
    match kind {
        RecordKind::Character => check::<Character>(payload),
        RecordKind::Location => check::<Location>(payload),
        RecordKind::TimelineEvent => check::<TimelineEvent>(payload),
        RecordKind::PlotPoint => check::<PlotPoint>(payload),
        RecordKind::Conflict => check::<Conflict>(payload),
    }
}

/// Sort key an untyped payload would get from its typed form.
pub fn payload_sort_key(kind: RecordKind, payload: &serde_json::Value) -> i64 {
    match kind {
        RecordKind::PlotPoint => payload
            .get("sequence_order")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0),
        _ => 0,
    }
}

// ============================================================================
// Service
// ============================================================================

/// Typed CRUD over a [`RecordStore`].
pub struct RecordService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for RecordService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> RecordService<S>
where
    S: RecordStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create<T: StoryRecord>(&self, manuscript_id: Uuid, data: T) -> Result<Record<T>> {
        data.validate()?;
        let now = Utc::now();
        let record = Record {
            id: Uuid::new_v4(),
            manuscript_id,
            created_at: now,
            updated_at: now,
            data,
        };
        let stored = record.to_stored()?;
        let stored = blocking(&self.store, move |store| store.insert_record(stored)).await?;
        debug!(kind = %T::KIND, id = %stored.id, %manuscript_id, "created record");
        Ok(Record::from_stored(stored)?)
    }

    /// Records of a kind for a manuscript, in (sort key, creation) order.
    pub async fn list<T: StoryRecord>(&self, manuscript_id: Uuid) -> Result<Vec<Record<T>>> {
        let rows =
            blocking(&self.store, move |store| store.list_records(T::KIND, manuscript_id)).await?;
        rows.into_iter()
            .map(|row| Record::from_stored(row).map_err(QuillError::from))
            .collect()
    }

    pub async fn get<T: StoryRecord>(&self, id: Uuid) -> Result<Option<Record<T>>> {
        let row = blocking(&self.store, move |store| store.get_record(T::KIND, id)).await?;
        row.map(Record::from_stored)
            .transpose()
            .map_err(QuillError::from)
    }

    pub async fn update<T: StoryRecord>(&self, mut record: Record<T>) -> Result<Record<T>> {
        record.data.validate()?;
        record.updated_at = Utc::now();
        let stored = record.to_stored()?;
        let stored = blocking(&self.store, move |store| store.update_record(stored)).await?;
        Ok(Record::from_stored(stored)?)
    }

    pub async fn delete<T: StoryRecord>(&self, id: Uuid) -> Result<()> {
        blocking(&self.store, move |store| store.delete_record(T::KIND, id))
            .await
            .map_err(QuillError::from)
    }
}
