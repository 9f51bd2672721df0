//! In-memory store for tests, demos and offline sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{DraftStore, ManuscriptStore, RecordStore, VersionStore};
use crate::drafts::{Draft, NewDraft};
use crate::error::StoreError;
use crate::manuscript::{Chapter, Manuscript, NewManuscript};
use crate::records::{RecordKind, StoredRecord};
use crate::versions::{ChapterVersion, NewChapterVersion};

#[derive(Debug, Default)]
struct State {
    manuscripts: Vec<Manuscript>,
    versions: Vec<ChapterVersion>,
    /// Last number handed out per (manuscript, chapter)
    version_counters: HashMap<(Uuid, String), u32>,
    drafts: Vec<Draft>,
    records: Vec<StoredRecord>,
}

impl State {
    fn require_manuscript(&self, id: Uuid) -> Result<(), StoreError> {
        if self.manuscripts.iter().any(|m| m.id == id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("manuscript {}", id)))
        }
    }
}

/// Store that keeps everything in a single mutex-guarded state.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ManuscriptStore for InMemoryStore {
    fn create_manuscript(&self, new: NewManuscript) -> Result<Manuscript, StoreError> {
        new.validate()
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let manuscript = new.into_manuscript(Utc::now());
        self.state().manuscripts.push(manuscript.clone());
        Ok(manuscript)
    }

    fn get_manuscript(&self, id: Uuid) -> Result<Option<Manuscript>, StoreError> {
        Ok(self.state().manuscripts.iter().find(|m| m.id == id).cloned())
    }

    fn list_manuscripts(&self, owner_id: &str) -> Result<Vec<Manuscript>, StoreError> {
        let state = self.state();
        let mut owned: Vec<Manuscript> = state
            .manuscripts
            .iter()
            .rev()
            .filter(|m| m.owner_id == owner_id)
            .cloned()
            .collect();
        // Stable sort keeps newest-inserted first among equal timestamps
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned)
    }

    fn update_content(
        &self,
        id: Uuid,
        chapters: &[Chapter],
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let manuscript = state
            .manuscripts
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("manuscript {}", id)))?;
        manuscript.chapters = chapters.to_vec();
        manuscript.updated_at = updated_at;
        Ok(())
    }

    fn delete_manuscript(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state();
        state.require_manuscript(id)?;
        state.manuscripts.retain(|m| m.id != id);
        state.versions.retain(|v| v.manuscript_id != id);
        state.version_counters.retain(|(ms, _), _| *ms != id);
        state.drafts.retain(|d| d.manuscript_id != id);
        state.records.retain(|r| r.manuscript_id != id);
        Ok(())
    }
}

impl VersionStore for InMemoryStore {
    fn append_version(&self, new: NewChapterVersion) -> Result<ChapterVersion, StoreError> {
        let mut state = self.state();
        state.require_manuscript(new.manuscript_id)?;

        let key = (new.manuscript_id, new.chapter_id.clone());
        let existing_max = state
            .versions
            .iter()
            .filter(|v| v.manuscript_id == new.manuscript_id && v.chapter_id == new.chapter_id)
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0);
        let counter = state.version_counters.entry(key).or_insert(existing_max);
        *counter += 1;
        let version_number = *counter;

        let version = ChapterVersion {
            id: Uuid::new_v4(),
            manuscript_id: new.manuscript_id,
            chapter_id: new.chapter_id,
            title: new.title,
            content: new.content,
            version_number,
            created_at: Utc::now(),
        };
        state.versions.push(version.clone());
        Ok(version)
    }

    fn list_versions(
        &self,
        manuscript_id: Uuid,
        chapter_id: &str,
    ) -> Result<Vec<ChapterVersion>, StoreError> {
        let mut versions: Vec<ChapterVersion> = self
            .state()
            .versions
            .iter()
            .filter(|v| v.manuscript_id == manuscript_id && v.chapter_id == chapter_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    fn get_version(&self, id: Uuid) -> Result<Option<ChapterVersion>, StoreError> {
        Ok(self.state().versions.iter().find(|v| v.id == id).cloned())
    }

    fn delete_version(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.versions.len();
        state.versions.retain(|v| v.id != id);
        if state.versions.len() == before {
            return Err(StoreError::NotFound(format!("version {}", id)));
        }
        Ok(())
    }
}

impl DraftStore for InMemoryStore {
    fn insert_current_draft(&self, new: NewDraft) -> Result<Draft, StoreError> {
        let mut state = self.state();
        state.require_manuscript(new.manuscript_id)?;

        for draft in state.drafts.iter_mut().filter(|d| d.manuscript_id == new.manuscript_id) {
            draft.is_current = false;
        }
        let now = Utc::now();
        let draft = Draft {
            id: Uuid::new_v4(),
            manuscript_id: new.manuscript_id,
            title: new.title,
            description: new.description,
            chapters: new.chapters,
            is_current: true,
            created_at: now,
            updated_at: now,
        };
        state.drafts.push(draft.clone());
        Ok(draft)
    }

    fn list_drafts(&self, manuscript_id: Uuid) -> Result<Vec<Draft>, StoreError> {
        let mut drafts: Vec<Draft> = self
            .state()
            .drafts
            .iter()
            .rev()
            .filter(|d| d.manuscript_id == manuscript_id)
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drafts)
    }

    fn mark_current(&self, id: Uuid) -> Result<Draft, StoreError> {
        let mut state = self.state();
        let manuscript_id = state
            .drafts
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.manuscript_id)
            .ok_or_else(|| StoreError::NotFound(format!("draft {}", id)))?;

        let now = Utc::now();
        let mut marked = None;
        for draft in state.drafts.iter_mut().filter(|d| d.manuscript_id == manuscript_id) {
            draft.is_current = draft.id == id;
            if draft.is_current {
                draft.updated_at = now;
                marked = Some(draft.clone());
            }
        }
        marked.ok_or_else(|| StoreError::NotFound(format!("draft {}", id)))
    }

    fn delete_draft(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.drafts.len();
        state.drafts.retain(|d| d.id != id);
        if state.drafts.len() == before {
            return Err(StoreError::NotFound(format!("draft {}", id)));
        }
        Ok(())
    }
}

impl RecordStore for InMemoryStore {
    fn insert_record(&self, record: StoredRecord) -> Result<StoredRecord, StoreError> {
        let mut state = self.state();
        state.require_manuscript(record.manuscript_id)?;
        if state.records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::AlreadyExists(format!("record {}", record.id)));
        }
        state.records.push(record.clone());
        Ok(record)
    }

    fn get_record(&self, kind: RecordKind, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self
            .state()
            .records
            .iter()
            .find(|r| r.id == id && r.kind == kind)
            .cloned())
    }

    fn list_records(
        &self,
        kind: RecordKind,
        manuscript_id: Uuid,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let mut rows: Vec<StoredRecord> = self
            .state()
            .records
            .iter()
            .filter(|r| r.kind == kind && r.manuscript_id == manuscript_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.sort_key
                .cmp(&b.sort_key)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(rows)
    }

    fn update_record(&self, record: StoredRecord) -> Result<StoredRecord, StoreError> {
        let mut state = self.state();
        let existing = state
            .records
            .iter_mut()
            .find(|r| r.id == record.id && r.kind == record.kind)
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", record.kind, record.id)))?;
        existing.payload = record.payload;
        existing.sort_key = record.sort_key;
        existing.updated_at = record.updated_at;
        Ok(existing.clone())
    }

    fn delete_record(&self, kind: RecordKind, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.records.len();
        state.records.retain(|r| !(r.id == id && r.kind == kind));
        if state.records.len() == before {
            return Err(StoreError::NotFound(format!("{} {}", kind, id)));
        }
        Ok(())
    }
}
