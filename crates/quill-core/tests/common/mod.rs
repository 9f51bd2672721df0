//! Shared helpers for quill-core integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_core::{
    AutosaveConfig, AutosaveScheduler, Chapter, CollectingNotifier, DocumentStore, InMemoryStore,
    Manuscript, ManuscriptStore, NewManuscript, StoreError,
};
use uuid::Uuid;

/// Manuscript store that counts content writes and can be told to fail them.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    writes: AtomicUsize,
    fail: AtomicBool,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn stored_chapters(&self, id: Uuid) -> Vec<Chapter> {
        self.inner
            .get_manuscript(id)
            .unwrap()
            .map(|m| m.chapters)
            .unwrap_or_default()
    }
}

impl ManuscriptStore for CountingStore {
    fn create_manuscript(&self, new: NewManuscript) -> Result<Manuscript, StoreError> {
        self.inner.create_manuscript(new)
    }

    fn get_manuscript(&self, id: Uuid) -> Result<Option<Manuscript>, StoreError> {
        self.inner.get_manuscript(id)
    }

    fn list_manuscripts(&self, owner_id: &str) -> Result<Vec<Manuscript>, StoreError> {
        self.inner.list_manuscripts(owner_id)
    }

    fn update_content(
        &self,
        id: Uuid,
        chapters: &[Chapter],
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("connection reset".to_string()));
        }
        self.inner.update_content(id, chapters, updated_at)
    }

    fn delete_manuscript(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete_manuscript(id)
    }
}

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub document: Arc<Mutex<DocumentStore>>,
    pub notifier: Arc<CollectingNotifier>,
    pub scheduler: AutosaveScheduler,
    pub manuscript_id: Uuid,
}

impl Harness {
    /// Scheduler over a stored manuscript with chapters "1" and "2".
    pub fn new() -> Self {
        let store = Arc::new(CountingStore::default());
        let manuscript = store
            .create_manuscript(NewManuscript::new("user-1", "Novel"))
            .unwrap();
        let document = Arc::new(Mutex::new(DocumentStore::from_chapters(vec![
            Chapter::numbered("1"),
            Chapter::numbered("2"),
        ])));
        let notifier = Arc::new(CollectingNotifier::new());
        let scheduler = AutosaveScheduler::new(
            Arc::clone(&document),
            store.clone(),
            notifier.clone(),
            Some(manuscript.id),
            &AutosaveConfig::default(),
        );
        Self {
            store,
            document,
            notifier,
            scheduler,
            manuscript_id: manuscript.id,
        }
    }

    pub fn content(&self, chapter_id: &str) -> String {
        self.document
            .lock()
            .unwrap()
            .chapter(chapter_id)
            .map(|c| c.content.clone())
            .unwrap_or_default()
    }

    pub fn revision(&self) -> u64 {
        self.document.lock().unwrap().revision()
    }

    /// Let spawned timer tasks run and wait for in-flight writes.
    pub async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        while self.scheduler.is_saving() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
