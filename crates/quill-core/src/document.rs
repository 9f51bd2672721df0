//! In-memory chapter list and edit buffer
//!
//! `DocumentStore` is the authoritative copy of a manuscript's chapters while it
//! is open in the editor. It holds three pieces of state:
//!
//! - the ordered chapter list (order is authorial sequence)
//! - the id of the active chapter
//! - the edit buffer, i.e. the content currently shown in the editor
//!
//! The buffer is deliberately *not* written back into the chapter list on every
//! keystroke. The autosave scheduler commits it later via [`DocumentStore::commit`],
//! naming the chapter explicitly so a chapter switch in between cannot redirect
//! the write.
//!
//! # Example
//!
//! ```
//! use quill_core::document::DocumentStore;
//!
//! let mut doc = DocumentStore::new();
//! doc.update_buffer("<p>It was a dark night.</p>");
//! let added = doc.add_chapter().id.clone();
//! assert_eq!(added, "2");
//! assert_eq!(doc.active_chapter_id(), "2");
//! ```

use tracing::{debug, warn};

use crate::error::{QuillError, Result};
use crate::manuscript::{Chapter, ChapterMetadata};

/// Ordered chapter list plus the active editing buffer.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    chapters: Vec<Chapter>,
    active: String,
    buffer: String,
    /// Next id handed out by `add_chapter`; never decreases
    next_id: u64,
    /// Bumped on every chapter-list mutation
    revision: u64,
}

impl DocumentStore {
    /// A document with a single empty `Chapter 1`.
    pub fn new() -> Self {
        Self::from_chapters(Vec::new())
    }

    /// Open a document on an existing chapter list. The first chapter becomes active.
    pub fn from_chapters(chapters: Vec<Chapter>) -> Self {
        let mut doc = Self {
            chapters: Vec::new(),
            active: String::new(),
            buffer: String::new(),
            next_id: 1,
            revision: 0,
        };
        doc.load(chapters);
        doc.revision = 0;
        doc
    }

    /// Replace the whole chapter list (manuscript load, draft load).
    ///
    /// The active chapter is kept if it still exists, otherwise the first
    /// chapter is selected. An empty list becomes a single `Chapter 1`.
    pub fn load(&mut self, chapters: Vec<Chapter>) {
        self.chapters = if chapters.is_empty() {
            vec![Chapter::numbered("1")]
        } else {
            chapters
        };
        self.next_id = seed_next_id(&self.chapters);

        if !self.chapters.iter().any(|c| c.id == self.active) {
            self.active = self.chapters[0].id.clone();
        }
        self.buffer = self
            .active_chapter()
            .map(|c| c.content.clone())
            .unwrap_or_default();
        self.bump();
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn active_chapter_id(&self) -> &str {
        &self.active
    }

    pub fn active_chapter(&self) -> Option<&Chapter> {
        self.chapter(&self.active)
    }

    /// Content currently being edited (may be ahead of the chapter list).
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Make `id` the active chapter and load its content into the buffer.
    ///
    /// Unknown ids are ignored; returns whether the selection happened.
    pub fn select_chapter(&mut self, id: &str) -> bool {
        let Some(chapter) = self.chapters.iter().find(|c| c.id == id) else {
            debug!(chapter_id = id, "ignoring selection of unknown chapter");
            return false;
        };
        self.buffer = chapter.content.clone();
        self.active = chapter.id.clone();
        true
    }

    /// Replace the edit buffer. The chapter list is untouched.
    pub fn update_buffer(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Append a new empty chapter and switch to it.
    pub fn add_chapter(&mut self) -> &Chapter {
        let id = self.next_id.to_string();
        self.next_id += 1;

        self.chapters.push(Chapter::numbered(id.clone()));
        self.active = id;
        self.buffer.clear();
        self.bump();

        &self.chapters[self.chapters.len() - 1]
    }

    /// Move the chapter `from_id` to the position currently held by `to_id`,
    /// shifting the chapters in between.
    ///
    /// Returns false (and leaves the list alone) if either id is unknown or
    /// both are the same chapter.
    pub fn reorder_chapters(&mut self, from_id: &str, to_id: &str) -> bool {
        if from_id == to_id {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(from_id), self.position(to_id)) else {
            return false;
        };

        let chapter = self.chapters.remove(from);
        self.chapters.insert(to, chapter);
        self.bump();
        true
    }

    /// Write `content` into the chapter named `chapter_id`.
    ///
    /// Returns whether the chapter list changed. A chapter deleted since the
    /// write was scheduled is skipped.
    pub fn commit(&mut self, chapter_id: &str, content: &str) -> bool {
        let Some(chapter) = self.chapters.iter_mut().find(|c| c.id == chapter_id) else {
            warn!(chapter_id, "dropping commit for a chapter that no longer exists");
            return false;
        };
        if chapter.content == content {
            return false;
        }
        chapter.content = content.to_string();
        self.bump();
        true
    }

    /// Put restored content into both the buffer and the active chapter.
    pub fn restore_content(&mut self, content: &str) -> bool {
        self.buffer = content.to_string();
        let active = self.active.clone();
        self.commit(&active, content)
    }

    pub fn rename_chapter(&mut self, id: &str, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        let chapter = self.chapter_mut(id)?;
        if chapter.title != title {
            chapter.title = title;
            self.bump();
        }
        Ok(())
    }

    pub fn set_chapter_metadata(&mut self, id: &str, metadata: ChapterMetadata) -> Result<()> {
        let chapter = self.chapter_mut(id)?;
        chapter.metadata = Some(metadata);
        self.bump();
        Ok(())
    }

    /// Remove a chapter. The last remaining chapter cannot be deleted.
    ///
    /// Deleting the active chapter selects the chapter that slides into its
    /// slot, or the new last chapter.
    pub fn delete_chapter(&mut self, id: &str) -> Result<Chapter> {
        let pos = self
            .position(id)
            .ok_or_else(|| QuillError::ChapterNotFound(id.to_string()))?;
        if self.chapters.len() == 1 {
            return Err(QuillError::InvalidOperation(
                "a manuscript needs at least one chapter".to_string(),
            ));
        }

        let removed = self.chapters.remove(pos);
        if removed.id == self.active {
            let next = pos.min(self.chapters.len() - 1);
            let next_id = self.chapters[next].id.clone();
            self.select_chapter(&next_id);
        }
        self.bump();
        Ok(removed)
    }

    /// Chapters whose title or content contains `query`, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<&Chapter> {
        let needle = query.to_lowercase();
        self.chapters
            .iter()
            .filter(|c| {
                c.title.to_lowercase().contains(&needle)
                    || c.content.to_lowercase().contains(&needle)
            })
            .collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == id)
    }

    fn chapter_mut(&mut self, id: &str) -> Result<&mut Chapter> {
        self.chapters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| QuillError::ChapterNotFound(id.to_string()))
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Next free numeric id: one past the larger of the list length and the
/// highest numeric id already present.
fn seed_next_id(chapters: &[Chapter]) -> u64 {
    let max_numeric = chapters
        .iter()
        .filter_map(|c| c.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    max_numeric.max(chapters.len() as u64) + 1
}
