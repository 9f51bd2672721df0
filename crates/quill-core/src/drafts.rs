//! Whole-manuscript drafts
//!
//! A draft freezes the complete chapter list under a name. Exactly one draft
//! per manuscript is marked current: the most recently saved or loaded one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{QuillError, Result, ValidationError};
use crate::manuscript::Chapter;
use crate::store::{blocking, DraftStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: Uuid,
    pub manuscript_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub chapters: Vec<Chapter>,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDraft {
    pub manuscript_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub chapters: Vec<Chapter>,
}

impl NewDraft {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::required("title", "Draft title is required"));
        }
        Ok(())
    }
}

pub struct DraftService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for DraftService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> DraftService<S>
where
    S: DraftStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Save the chapter list as the new current draft.
    pub async fn save_draft(&self, draft: NewDraft) -> Result<Draft> {
        draft.validate()?;
        let saved = blocking(&self.store, move |store| store.insert_current_draft(draft)).await?;
        info!(manuscript_id = %saved.manuscript_id, draft_id = %saved.id, "saved draft");
        Ok(saved)
    }

    /// Mark a draft current and hand back its chapters.
    pub async fn load_draft(&self, draft_id: Uuid) -> Result<Draft> {
        let draft = blocking(&self.store, move |store| store.mark_current(draft_id)).await?;
        info!(manuscript_id = %draft.manuscript_id, %draft_id, "loaded draft");
        Ok(draft)
    }

    /// Drafts of a manuscript, newest first.
    pub async fn list_drafts(&self, manuscript_id: Uuid) -> Result<Vec<Draft>> {
        blocking(&self.store, move |store| store.list_drafts(manuscript_id))
            .await
            .map_err(QuillError::from)
    }

    pub async fn delete_draft(&self, draft_id: Uuid) -> Result<()> {
        blocking(&self.store, move |store| store.delete_draft(draft_id))
            .await
            .map_err(QuillError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manuscript::NewManuscript;
    use crate::store::{InMemoryStore, ManuscriptStore};

    fn new_draft(ms: Uuid, title: &str, body: &str) -> NewDraft {
        NewDraft {
            manuscript_id: ms,
            title: title.to_string(),
            description: None,
            chapters: vec![Chapter::new("1", "Chapter 1", body)],
        }
    }

    #[tokio::test]
    async fn test_blank_title_rejected_before_store() {
        let store = Arc::new(InMemoryStore::new());
        let service = DraftService::new(store);
        let err = service
            .save_draft(new_draft(Uuid::new_v4(), "  ", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Draft title is required");
    }

    #[tokio::test]
    async fn test_only_latest_draft_is_current() {
        let store = Arc::new(InMemoryStore::new());
        let ms = store
            .create_manuscript(NewManuscript::new("user-1", "Novel"))
            .unwrap()
            .id;
        let service = DraftService::new(store);

        let first = service.save_draft(new_draft(ms, "First pass", "a")).await.unwrap();
        let second = service.save_draft(new_draft(ms, "Second pass", "b")).await.unwrap();

        let drafts = service.list_drafts(ms).await.unwrap();
        assert_eq!(drafts[0].id, second.id);
        assert!(drafts[0].is_current);
        assert!(!drafts[1].is_current);

        let loaded = service.load_draft(first.id).await.unwrap();
        assert_eq!(loaded.chapters[0].content, "a");
        let current: Vec<_> = service
            .list_drafts(ms)
            .await
            .unwrap()
            .into_iter()
            .filter(|d| d.is_current)
            .map(|d| d.id)
            .collect();
        assert_eq!(current, vec![first.id]);

        service.delete_draft(second.id).await.unwrap();
        assert_eq!(service.list_drafts(ms).await.unwrap().len(), 1);
    }
}
