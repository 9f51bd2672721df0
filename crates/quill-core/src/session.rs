//! An open manuscript in the editor
//!
//! [`EditorSession`] ties the document, the autosave timers, version history
//! and drafts together for one manuscript. User actions go through it so that
//! every chapter-list change re-arms the persist timer and every failure ends
//! up as a notification instead of an error the UI has to handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};
use uuid::Uuid;

use crate::autosave::AutosaveScheduler;
use crate::config::QuillConfig;
use crate::document::DocumentStore;
use crate::drafts::{Draft, DraftService, NewDraft};
use crate::error::{QuillError, Result, StoreError};
use crate::export::{export_markdown, export_plain_text};
use crate::manuscript::{Chapter, ChapterMetadata, Manuscript};
use crate::notify::{Notification, Notifier};
use crate::records::RecordService;
use crate::stats::{total_words, WordStats, WritingGoals};
use crate::store::{blocking, Store};
use crate::versions::{ChapterVersion, VersionService};

pub struct EditorSession<S> {
    manuscript_id: Uuid,
    title: String,
    document: Arc<Mutex<DocumentStore>>,
    autosave: AutosaveScheduler,
    versions: VersionService<S>,
    drafts: DraftService<S>,
    records: RecordService<S>,
    notifier: Arc<dyn Notifier>,
    /// Total words when the session was opened
    session_start_words: usize,
}

impl<S> EditorSession<S>
where
    S: Store + 'static,
{
    /// Load a manuscript and start editing its first chapter.
    pub async fn open(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        config: &QuillConfig,
        manuscript_id: Uuid,
    ) -> Result<Self> {
        let loaded = blocking(&store, move |store| store.get_manuscript(manuscript_id))
            .await
            .and_then(|found| {
                found.ok_or_else(|| StoreError::NotFound(format!("manuscript {}", manuscript_id)))
            });
        match loaded {
            Ok(manuscript) => Ok(Self::from_manuscript(store, notifier, config, manuscript)),
            Err(e) => {
                warn!(%manuscript_id, error = %e, "failed to load manuscript");
                notifier.notify(Notification::error("Failed to load manuscript"));
                Err(e.into())
            }
        }
    }

    /// Start a session on an already-loaded manuscript.
    pub fn from_manuscript(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        config: &QuillConfig,
        manuscript: Manuscript,
    ) -> Self {
        let session_start_words = total_words(&manuscript.chapters);
        let document = Arc::new(Mutex::new(DocumentStore::from_chapters(manuscript.chapters)));
        let autosave = AutosaveScheduler::new(
            Arc::clone(&document),
            store.clone(),
            Arc::clone(&notifier),
            Some(manuscript.id),
            &config.autosave,
        );
        info!(manuscript_id = %manuscript.id, "opened manuscript");

        Self {
            manuscript_id: manuscript.id,
            title: manuscript.title,
            document,
            autosave,
            versions: VersionService::new(Arc::clone(&store)),
            drafts: DraftService::new(Arc::clone(&store)),
            records: RecordService::new(store),
            notifier,
            session_start_words,
        }
    }

    pub fn manuscript_id(&self) -> Uuid {
        self.manuscript_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn autosave(&self) -> &AutosaveScheduler {
        &self.autosave
    }

    pub fn records(&self) -> &RecordService<S> {
        &self.records
    }

    fn document(&self) -> MutexGuard<'_, DocumentStore> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read access to the document.
    pub fn with_document<R>(&self, f: impl FnOnce(&DocumentStore) -> R) -> R {
        f(&self.document())
    }

    pub fn chapters(&self) -> Vec<Chapter> {
        self.document().chapters().to_vec()
    }

    pub fn buffer(&self) -> String {
        self.document().buffer().to_string()
    }

    pub fn active_chapter_id(&self) -> String {
        self.document().active_chapter_id().to_string()
    }

    // =========================================================================
    // Chapter editing
    // =========================================================================

    /// Switch chapters. A pending commit is left alone and still lands in the
    /// chapter it was typed into.
    pub fn select_chapter(&self, id: &str) -> bool {
        let pending = self.autosave.pending_content(id);
        let mut doc = self.document();
        if !doc.select_chapter(id) {
            return false;
        }
        // Coming back before the commit fired: show what was typed, not the stale list copy
        if let Some(content) = pending {
            doc.update_buffer(content);
        }
        true
    }

    /// Replace the edit buffer and arm the commit timer for the active chapter.
    pub fn update_buffer(&self, content: impl Into<String>) {
        let content = content.into();
        let active = {
            let mut doc = self.document();
            doc.update_buffer(content.clone());
            doc.active_chapter_id().to_string()
        };
        self.autosave.buffer_changed(&active, &content);
    }

    pub fn add_chapter(&self) -> Chapter {
        let chapter = self.document().add_chapter().clone();
        self.autosave.schedule_persist();
        chapter
    }

    pub fn reorder_chapters(&self, from_id: &str, to_id: &str) -> bool {
        let moved = self.document().reorder_chapters(from_id, to_id);
        if moved {
            self.autosave.schedule_persist();
        }
        moved
    }

    pub fn rename_chapter(&self, id: &str, title: impl Into<String>) -> Result<()> {
        self.document().rename_chapter(id, title)?;
        self.autosave.schedule_persist();
        Ok(())
    }

    pub fn set_chapter_metadata(&self, id: &str, metadata: ChapterMetadata) -> Result<()> {
        self.document().set_chapter_metadata(id, metadata)?;
        self.autosave.schedule_persist();
        Ok(())
    }

    pub fn delete_chapter(&self, id: &str) -> Result<Chapter> {
        let removed = self.document().delete_chapter(id);
        match removed {
            Ok(chapter) => {
                self.autosave.schedule_persist();
                Ok(chapter)
            }
            Err(e) => {
                if let QuillError::InvalidOperation(_) = e {
                    self.notifier
                        .notify(Notification::error("Cannot delete the only chapter"));
                }
                Err(e)
            }
        }
    }

    pub fn search(&self, query: &str) -> Vec<Chapter> {
        self.document().search(query).into_iter().cloned().collect()
    }

    /// Write the pending buffer and chapter list to the store now.
    pub async fn flush(&self) -> Result<()> {
        self.autosave.flush().await.map_err(QuillError::from)
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Content of the active chapter including typing the commit timer has not
    /// applied yet.
    fn active_snapshot(&self) -> Option<(String, String, String)> {
        let active = self.active_chapter_id();
        self.current_chapters()
            .into_iter()
            .find(|c| c.id == active)
            .map(|c| (c.id, c.title, c.content))
    }

    /// Snapshot the active chapter.
    pub async fn save_version(&self) -> Result<ChapterVersion> {
        let (chapter_id, title, content) = self
            .active_snapshot()
            .ok_or_else(|| QuillError::ChapterNotFound(self.active_chapter_id()))?;
        match self
            .versions
            .save_version(self.manuscript_id, &chapter_id, &title, &content)
            .await
        {
            Ok(version) => {
                self.notifier.notify(Notification::success(format!(
                    "Version {} saved!",
                    version.version_number
                )));
                Ok(version)
            }
            Err(e) => {
                warn!(chapter_id, error = %e, "failed to save version");
                self.notifier
                    .notify(Notification::error("Failed to save version"));
                Err(e.into())
            }
        }
    }

    /// Version history of the active chapter, newest first.
    pub async fn list_versions(&self) -> Result<Vec<ChapterVersion>> {
        let chapter_id = self.active_chapter_id();
        self.versions
            .list_versions(self.manuscript_id, &chapter_id)
            .await
            .map_err(|e| {
                warn!(chapter_id, error = %e, "failed to load version history");
                self.notifier
                    .notify(Notification::error("Failed to load version history"));
                e.into()
            })
    }

    /// Put a snapshot's content back into the active chapter.
    pub fn restore_version(&self, version: &ChapterVersion) {
        let content = self.versions.restore_version(version);
        let active = {
            let mut doc = self.document();
            doc.restore_content(&content);
            doc.active_chapter_id().to_string()
        };
        // Replaces any pending commit so older typing cannot overwrite the restore
        self.autosave.buffer_changed(&active, &content);
        self.autosave.schedule_persist();
        self.notifier.notify(Notification::info(format!(
            "Restored to version {}",
            version.version_number
        )));
    }

    pub async fn delete_version(&self, id: Uuid) -> Result<()> {
        self.versions.delete_version(id).await.map_err(QuillError::from)
    }

    // =========================================================================
    // Drafts
    // =========================================================================

    /// Chapter list with the pending commit applied to the chapter it was
    /// typed into, whichever chapter is active now.
    pub fn current_chapters(&self) -> Vec<Chapter> {
        let pending = self.autosave.pending_commit();
        let mut chapters = self.chapters();
        if let Some((chapter_id, content)) = pending {
            if let Some(chapter) = chapters.iter_mut().find(|c| c.id == chapter_id) {
                chapter.content = content;
            }
        }
        chapters
    }

    pub async fn save_draft(
        &self,
        title: &str,
        description: Option<String>,
    ) -> Result<Draft> {
        let draft = NewDraft {
            manuscript_id: self.manuscript_id,
            title: title.trim().to_string(),
            description: description.filter(|d| !d.trim().is_empty()),
            chapters: self.current_chapters(),
        };
        match self.drafts.save_draft(draft).await {
            Ok(saved) => {
                self.notifier.notify(Notification::success("Draft saved!"));
                Ok(saved)
            }
            Err(QuillError::Validation(e)) => {
                self.notifier.notify(Notification::error(e.to_string()));
                Err(QuillError::Validation(e))
            }
            Err(e) => {
                warn!(error = %e, "failed to save draft");
                self.notifier.notify(Notification::error("Failed to save draft"));
                Err(e)
            }
        }
    }

    /// Replace the chapter list with a draft's chapters.
    pub async fn load_draft(&self, draft_id: Uuid) -> Result<Draft> {
        match self.drafts.load_draft(draft_id).await {
            Ok(draft) => {
                self.autosave.discard_pending();
                self.document().load(draft.chapters.clone());
                self.autosave.schedule_persist();
                self.notifier
                    .notify(Notification::success(format!("Loaded draft: {}", draft.title)));
                Ok(draft)
            }
            Err(e) => {
                warn!(%draft_id, error = %e, "failed to load draft");
                self.notifier.notify(Notification::error("Failed to load draft"));
                Err(e)
            }
        }
    }

    pub async fn list_drafts(&self) -> Result<Vec<Draft>> {
        self.drafts
            .list_drafts(self.manuscript_id)
            .await
            .map_err(|e| {
                self.notifier.notify(Notification::error("Failed to load drafts"));
                e
            })
    }

    pub async fn delete_draft(&self, draft_id: Uuid) -> Result<()> {
        match self.drafts.delete_draft(draft_id).await {
            Ok(()) => {
                self.notifier.notify(Notification::success("Draft deleted"));
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Notification::error("Failed to delete draft"));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Stats and export
    // =========================================================================

    pub fn word_stats(&self, goals: WritingGoals) -> WordStats {
        let active = self.active_chapter_id();
        WordStats::compute(
            &self.current_chapters(),
            &active,
            self.session_start_words,
            goals,
        )
    }

    pub fn export_plain_text(&self) -> String {
        export_plain_text(&self.title, &self.current_chapters())
    }

    pub fn export_markdown(&self) -> String {
        export_markdown(&self.title, &self.current_chapters())
    }
}
