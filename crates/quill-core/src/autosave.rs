//! Debounced autosave
//!
//! Two trailing debounce timers sit between the editor and the store:
//!
//! - the commit timer copies the edit buffer into the chapter list once typing
//!   has been idle for `commit_delay` (1s by default)
//! - the persist timer writes the whole chapter list to the store once the list
//!   has been idle for `persist_delay` (2s by default)
//!
//! Every qualifying change cancels the pending timer task and spawns a new
//! one. The commit timer captures the chapter id and content by value when it
//! is armed, so switching chapters before it fires cannot redirect the write.
//!
//! Store writes run detached from the persist timer: re-arming the timer
//! never cancels a write already in flight. Overlapping writes are not
//! serialized; whichever finishes last determines the stored content. A failed
//! write is reported through the [`Notifier`] and is not retried; the next list
//! change simply schedules another attempt.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AutosaveConfig;
use crate::document::DocumentStore;
use crate::error::StoreError;
use crate::notify::{Notification, Notifier};
use crate::store::{blocking, ManuscriptStore};

/// Single-shot trailing debounce timer.
///
/// Arming spawns `sleep(delay)` followed by the given future on the current
/// tokio runtime and aborts whatever was armed before. Dropping the debouncer
/// aborts the pending task.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            handle: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending task and schedule `task` after the idle window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether an armed task has not completed yet.
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Buffer content waiting for the commit timer, bound to its chapter.
#[derive(Debug, Clone)]
struct PendingCommit {
    seq: u64,
    chapter_id: String,
    content: String,
}

#[derive(Debug)]
struct CommitTimer {
    timer: Debouncer,
    pending: Option<PendingCommit>,
    seq: u64,
}

struct Inner {
    manuscript_id: Option<Uuid>,
    document: Arc<Mutex<DocumentStore>>,
    store: Arc<dyn ManuscriptStore>,
    notifier: Arc<dyn Notifier>,
    // Lock order: commit, then document, then persist
    commit: Mutex<CommitTimer>,
    persist: Mutex<Debouncer>,
    saving: Arc<AtomicUsize>,
}

impl Inner {
    fn commit(&self) -> MutexGuard<'_, CommitTimer> {
        self.commit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn document(&self) -> MutexGuard<'_, DocumentStore> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self) -> MutexGuard<'_, Debouncer> {
        self.persist.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives the buffer-to-list and list-to-store timers for one open manuscript.
#[derive(Clone)]
pub struct AutosaveScheduler {
    inner: Arc<Inner>,
}

impl AutosaveScheduler {
    /// Scheduler for `document`. Without a `manuscript_id` nothing is ever
    /// written to the store; the commit timer still runs.
    pub fn new(
        document: Arc<Mutex<DocumentStore>>,
        store: Arc<dyn ManuscriptStore>,
        notifier: Arc<dyn Notifier>,
        manuscript_id: Option<Uuid>,
        config: &AutosaveConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                manuscript_id,
                document,
                store,
                notifier,
                commit: Mutex::new(CommitTimer {
                    timer: Debouncer::new(config.commit_delay()),
                    pending: None,
                    seq: 0,
                }),
                persist: Mutex::new(Debouncer::new(config.persist_delay())),
                saving: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn manuscript_id(&self) -> Option<Uuid> {
        self.inner.manuscript_id
    }

    /// The edit buffer of `chapter_id` changed to `content`; (re)arm the commit timer.
    ///
    /// If the pending commit belongs to another chapter it is written into that
    /// chapter right away instead of being dropped.
    pub fn buffer_changed(&self, chapter_id: &str, content: &str) {
        let mut list_changed = false;
        {
            let mut commit = self.inner.commit();
            if let Some(previous) = commit.pending.take() {
                if previous.chapter_id != chapter_id {
                    list_changed = self
                        .inner
                        .document()
                        .commit(&previous.chapter_id, &previous.content);
                    debug!(
                        chapter_id = %previous.chapter_id,
                        "committed pending buffer before switching chapters"
                    );
                }
            }

            commit.seq += 1;
            let seq = commit.seq;
            commit.pending = Some(PendingCommit {
                seq,
                chapter_id: chapter_id.to_string(),
                content: content.to_string(),
            });
            let weak = Arc::downgrade(&self.inner);
            commit.timer.arm(async move {
                if let Some(inner) = weak.upgrade() {
                    fire_commit(&inner, seq);
                }
            });
        }
        if list_changed {
            schedule_persist(&self.inner);
        }
    }

    /// The chapter list changed; (re)arm the persist timer.
    pub fn schedule_persist(&self) {
        schedule_persist(&self.inner);
    }

    /// Content still waiting for the commit timer, if it targets `chapter_id`.
    pub fn pending_content(&self, chapter_id: &str) -> Option<String> {
        self.inner
            .commit()
            .pending
            .as_ref()
            .filter(|p| p.chapter_id == chapter_id)
            .map(|p| p.content.clone())
    }

    /// The commit still waiting for its timer as `(chapter_id, content)`.
    pub fn pending_commit(&self) -> Option<(String, String)> {
        self.inner
            .commit()
            .pending
            .as_ref()
            .map(|p| (p.chapter_id.clone(), p.content.clone()))
    }

    /// Whether either timer is armed.
    pub fn has_pending(&self) -> bool {
        let commit_pending = self.inner.commit().timer.is_pending();
        commit_pending || self.inner.persist().is_pending()
    }

    /// Whether a store write is in flight.
    pub fn is_saving(&self) -> bool {
        self.inner.saving.load(Ordering::SeqCst) > 0
    }

    /// Drop the pending buffer commit without applying it.
    pub fn discard_pending(&self) {
        let mut commit = self.inner.commit();
        commit.timer.cancel();
        commit.pending = None;
    }

    /// Cancel both timers, commit the pending buffer and write the chapter
    /// list to the store now.
    pub async fn flush(&self) -> Result<(), StoreError> {
        {
            let mut commit = self.inner.commit();
            commit.timer.cancel();
            if let Some(pending) = commit.pending.take() {
                self.inner
                    .document()
                    .commit(&pending.chapter_id, &pending.content);
            }
        }
        self.inner.persist().cancel();

        match persist_now(&self.inner) {
            Some(write) => write
                .await
                .map_err(|e| StoreError::Storage(format!("save task failed: {}", e)))?,
            None => Ok(()),
        }
    }
}

fn fire_commit(inner: &Arc<Inner>, seq: u64) {
    let list_changed = {
        let mut commit = inner.commit();
        if commit.pending.as_ref().map(|p| p.seq) != Some(seq) {
            return;
        }
        let Some(pending) = commit.pending.take() else {
            return;
        };
        let changed = inner
            .document()
            .commit(&pending.chapter_id, &pending.content);
        debug!(chapter_id = %pending.chapter_id, changed, "commit timer fired");
        changed
    };
    if list_changed {
        schedule_persist(inner);
    }
}

fn schedule_persist(inner: &Arc<Inner>) {
    if inner.manuscript_id.is_none() {
        return;
    }
    let weak: Weak<Inner> = Arc::downgrade(inner);
    inner.persist().arm(async move {
        if let Some(inner) = weak.upgrade() {
            // Detached so a later re-arm cannot abort the write
            let _ = persist_now(&inner);
        }
    });
}

/// Snapshot the chapter list and spawn the store write.
fn persist_now(inner: &Arc<Inner>) -> Option<JoinHandle<Result<(), StoreError>>> {
    let manuscript_id = inner.manuscript_id?;
    let chapters = inner.document().chapters().to_vec();
    let store = Arc::clone(&inner.store);
    let notifier = Arc::clone(&inner.notifier);
    let saving = Arc::clone(&inner.saving);

    saving.fetch_add(1, Ordering::SeqCst);
    Some(tokio::spawn(async move {
        let count = chapters.len();
        let result = blocking(&store, move |store| {
            store.update_content(manuscript_id, &chapters, Utc::now())
        })
        .await;
        saving.fetch_sub(1, Ordering::SeqCst);

        match &result {
            Ok(()) => debug!(%manuscript_id, chapters = count, "saved manuscript"),
            Err(e) => {
                warn!(%manuscript_id, error = %e, "failed to save manuscript");
                notifier.notify(Notification::error("Failed to save"));
            }
        }
        result
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manuscript::{Chapter, NewManuscript};
    use crate::notify::CollectingNotifier;
    use crate::store::InMemoryStore;

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_only_runs_last_task() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        for i in 0..3 {
            let hits = Arc::clone(&hits);
            debouncer.arm(async move { hits.lock().unwrap().push(i) });
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(*hits.lock().unwrap(), vec![2]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_manuscript_nothing_persists() {
        let store = Arc::new(InMemoryStore::new());
        let ms = store
            .create_manuscript(NewManuscript::new("user-1", "Novel"))
            .unwrap();
        let document = Arc::new(Mutex::new(DocumentStore::from_chapters(vec![
            Chapter::numbered("1"),
        ])));
        let scheduler = AutosaveScheduler::new(
            Arc::clone(&document),
            store.clone(),
            Arc::new(CollectingNotifier::new()),
            None,
            &AutosaveConfig::default(),
        );

        scheduler.buffer_changed("1", "<p>local only</p>");
        tokio::time::sleep(Duration::from_millis(5000)).await;

        assert_eq!(
            document.lock().unwrap().chapters()[0].content,
            "<p>local only</p>"
        );
        let stored = store.get_manuscript(ms.id).unwrap().unwrap();
        assert_eq!(stored.chapters[0].content, "");
        assert!(scheduler.flush().await.is_ok());
    }
}
