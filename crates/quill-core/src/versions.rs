//! Chapter version snapshots
//!
//! A version is an immutable copy of one chapter's title and content, numbered
//! per `(manuscript, chapter)` pair. Numbers are handed out by the store in a
//! single atomic step, so concurrent snapshots of the same chapter never share
//! a number and a deleted number is never reused.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::stats::{html_to_text, word_count};
use crate::store::{blocking, VersionStore};

/// Immutable snapshot of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterVersion {
    pub id: Uuid,
    pub manuscript_id: Uuid,
    pub chapter_id: String,
    pub title: String,
    pub content: String,
    /// 1-based, strictly increasing per (manuscript, chapter)
    pub version_number: u32,
    pub created_at: DateTime<Utc>,
}

impl ChapterVersion {
    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }

    /// First `words` words of the snapshot as plain text.
    pub fn preview(&self, words: usize) -> String {
        let text = html_to_text(&self.content);
        let mut iter = text.split_whitespace();
        let head: Vec<&str> = iter.by_ref().take(words).collect();
        let mut preview = head.join(" ");
        if iter.next().is_some() {
            preview.push_str("...");
        }
        preview
    }
}

/// Snapshot request; the store assigns id, number and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChapterVersion {
    pub manuscript_id: Uuid,
    pub chapter_id: String,
    pub title: String,
    pub content: String,
}

/// Creates, lists and restores chapter snapshots.
pub struct VersionService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for VersionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> VersionService<S>
where
    S: VersionStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append a snapshot with the next version number for the chapter.
    pub async fn save_version(
        &self,
        manuscript_id: Uuid,
        chapter_id: &str,
        title: &str,
        content: &str,
    ) -> Result<ChapterVersion, StoreError> {
        let new = NewChapterVersion {
            manuscript_id,
            chapter_id: chapter_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
        };
        let version = blocking(&self.store, move |store| store.append_version(new)).await?;
        info!(
            %manuscript_id,
            chapter_id,
            version_number = version.version_number,
            "saved chapter version"
        );
        Ok(version)
    }

    /// All snapshots of a chapter, newest first.
    pub async fn list_versions(
        &self,
        manuscript_id: Uuid,
        chapter_id: &str,
    ) -> Result<Vec<ChapterVersion>, StoreError> {
        let chapter = chapter_id.to_string();
        let versions =
            blocking(&self.store, move |store| store.list_versions(manuscript_id, &chapter))
                .await?;
        debug!(%manuscript_id, chapter_id, count = versions.len(), "listed chapter versions");
        Ok(versions)
    }

    /// Content to write back into the editor. Never touches the chapter list.
    pub fn restore_version(&self, version: &ChapterVersion) -> String {
        version.content.clone()
    }

    pub async fn delete_version(&self, id: Uuid) -> Result<(), StoreError> {
        blocking(&self.store, move |store| store.delete_version(id)).await
    }
}
