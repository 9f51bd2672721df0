//! Storage backends for manuscripts, versions, drafts and story records
//!
//! The traits are synchronous and `Send + Sync`, the way the SQLite backend
//! naturally works. Async callers go through [`blocking`], which moves the
//! call onto tokio's blocking pool so the editor's event loop never stalls on
//! a write.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::drafts::{Draft, NewDraft};
use crate::error::StoreError;
use crate::manuscript::{Chapter, Manuscript, NewManuscript};
use crate::records::{RecordKind, StoredRecord};
use crate::versions::{ChapterVersion, NewChapterVersion};

/// Manuscript records and their embedded chapter lists.
pub trait ManuscriptStore: Send + Sync {
    /// Validate and insert a new manuscript.
    fn create_manuscript(&self, new: NewManuscript) -> Result<Manuscript, StoreError>;

    fn get_manuscript(&self, id: Uuid) -> Result<Option<Manuscript>, StoreError>;

    /// Manuscripts owned by `owner_id`, most recently updated first.
    fn list_manuscripts(&self, owner_id: &str) -> Result<Vec<Manuscript>, StoreError>;

    /// Overwrite the chapter list and stamp `updated_at`. Last write wins.
    fn update_content(
        &self,
        id: Uuid,
        chapters: &[Chapter],
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Delete a manuscript together with its versions, drafts and records.
    fn delete_manuscript(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Append-only chapter snapshots.
pub trait VersionStore: Send + Sync {
    /// Insert a snapshot, assigning the next number for its chapter atomically.
    fn append_version(&self, new: NewChapterVersion) -> Result<ChapterVersion, StoreError>;

    /// Snapshots of a chapter ordered by version number, newest first.
    fn list_versions(
        &self,
        manuscript_id: Uuid,
        chapter_id: &str,
    ) -> Result<Vec<ChapterVersion>, StoreError>;

    fn get_version(&self, id: Uuid) -> Result<Option<ChapterVersion>, StoreError>;

    fn delete_version(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Named whole-manuscript drafts.
pub trait DraftStore: Send + Sync {
    /// Insert a draft as current, clearing the flag on every other draft.
    fn insert_current_draft(&self, new: NewDraft) -> Result<Draft, StoreError>;

    /// Drafts of a manuscript, newest first.
    fn list_drafts(&self, manuscript_id: Uuid) -> Result<Vec<Draft>, StoreError>;

    /// Make one draft current and return it.
    fn mark_current(&self, id: Uuid) -> Result<Draft, StoreError>;

    fn delete_draft(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Flat story records keyed by kind.
pub trait RecordStore: Send + Sync {
    fn insert_record(&self, record: StoredRecord) -> Result<StoredRecord, StoreError>;

    fn get_record(&self, kind: RecordKind, id: Uuid) -> Result<Option<StoredRecord>, StoreError>;

    /// Records of one kind, ordered by sort key then creation time.
    fn list_records(
        &self,
        kind: RecordKind,
        manuscript_id: Uuid,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Replace payload, sort key and `updated_at` of an existing record.
    fn update_record(&self, record: StoredRecord) -> Result<StoredRecord, StoreError>;

    fn delete_record(&self, kind: RecordKind, id: Uuid) -> Result<(), StoreError>;
}

/// Everything the editor needs from a backend.
pub trait Store: ManuscriptStore + VersionStore + DraftStore + RecordStore {}

impl<T> Store for T where T: ManuscriptStore + VersionStore + DraftStore + RecordStore {}

/// Run a store call on the blocking pool.
pub async fn blocking<S, T, F>(store: &Arc<S>, f: F) -> Result<T, StoreError>
where
    S: ?Sized + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| StoreError::Storage(format!("store task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocking_propagates_store_errors() {
        let store = Arc::new(InMemoryStore::new());
        let result = blocking(&store, |s| s.get_manuscript(Uuid::nil())).await;
        assert_eq!(result, Ok(None));

        let result: Result<(), StoreError> =
            blocking(&store, |s| s.delete_manuscript(Uuid::nil())).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
