//! Timing tests for the commit and persist timers, on tokio's paused clock

mod common;

use common::{advance_ms, Harness};

// === Commit timer (buffer → chapter list) ===

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_commit_only_last_value() {
    let h = Harness::new();
    h.scheduler.buffer_changed("1", "<p>I</p>");
    advance_ms(400).await;
    h.scheduler.buffer_changed("1", "<p>It</p>");
    advance_ms(400).await;
    h.scheduler.buffer_changed("1", "<p>It was</p>");

    // 900ms after the last edit: nothing committed yet
    advance_ms(900).await;
    assert_eq!(h.content("1"), "");
    assert_eq!(h.revision(), 0);

    advance_ms(150).await;
    assert_eq!(h.content("1"), "<p>It was</p>");
    assert_eq!(h.revision(), 1, "intermediate values must never reach the list");
}

#[tokio::test(start_paused = true)]
async fn test_commit_goes_to_chapter_active_when_armed() {
    let h = Harness::new();
    h.scheduler.buffer_changed("1", "<p>typed in one</p>");
    h.document.lock().unwrap().select_chapter("2");

    advance_ms(1100).await;
    assert_eq!(h.content("1"), "<p>typed in one</p>");
    assert_eq!(h.content("2"), "");
}

#[tokio::test(start_paused = true)]
async fn test_typing_in_new_chapter_commits_previous_immediately() {
    let h = Harness::new();
    h.scheduler.buffer_changed("1", "<p>one</p>");
    advance_ms(200).await;
    h.scheduler.buffer_changed("2", "<p>two</p>");

    assert_eq!(h.content("1"), "<p>one</p>");
    assert_eq!(h.content("2"), "");
    assert_eq!(h.scheduler.pending_content("2").as_deref(), Some("<p>two</p>"));

    advance_ms(1100).await;
    assert_eq!(h.content("2"), "<p>two</p>");
}

#[tokio::test(start_paused = true)]
async fn test_discard_pending_drops_the_commit() {
    let h = Harness::new();
    h.scheduler.buffer_changed("1", "<p>abandoned</p>");
    h.scheduler.discard_pending();

    advance_ms(5000).await;
    h.settle().await;
    assert_eq!(h.content("1"), "");
    assert_eq!(h.store.writes(), 0);
}

// === Persist timer (chapter list → store) ===

#[tokio::test(start_paused = true)]
async fn test_persist_fires_two_seconds_after_commit() {
    let h = Harness::new();
    h.scheduler.buffer_changed("1", "<p>hello</p>");

    // commit at 1000ms, persist due at 3000ms
    advance_ms(2900).await;
    h.settle().await;
    assert_eq!(h.store.writes(), 0);

    advance_ms(200).await;
    h.settle().await;
    assert_eq!(h.store.writes(), 1);
    assert_eq!(
        h.store.stored_chapters(h.manuscript_id)[0].content,
        "<p>hello</p>"
    );
    assert!(h.notifier.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_list_changes_rearm_persist_timer() {
    let h = Harness::new();
    h.scheduler.schedule_persist();
    advance_ms(1500).await;
    h.scheduler.schedule_persist();
    advance_ms(1500).await;
    h.settle().await;
    assert_eq!(h.store.writes(), 0, "trailing debounce must restart on each change");

    advance_ms(600).await;
    h.settle().await;
    assert_eq!(h.store.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_notifies_without_retry() {
    let h = Harness::new();
    h.store.set_failing(true);
    h.scheduler.buffer_changed("1", "<p>lost?</p>");

    advance_ms(3100).await;
    h.settle().await;
    assert_eq!(h.store.writes(), 1);
    assert_eq!(h.notifier.errors(), vec!["Failed to save"]);

    advance_ms(10_000).await;
    h.settle().await;
    assert_eq!(h.store.writes(), 1, "a failed write is not retried");

    // Local state survives, the next change schedules another attempt
    assert_eq!(h.content("1"), "<p>lost?</p>");
    h.store.set_failing(false);
    h.scheduler.buffer_changed("1", "<p>found</p>");
    advance_ms(3100).await;
    h.settle().await;
    assert_eq!(h.store.writes(), 2);
    assert_eq!(
        h.store.stored_chapters(h.manuscript_id)[0].content,
        "<p>found</p>"
    );
}

#[tokio::test(start_paused = true)]
async fn test_flush_writes_pending_buffer_now() {
    let h = Harness::new();
    h.scheduler.buffer_changed("2", "<p>last words</p>");

    h.scheduler.flush().await.unwrap();
    assert_eq!(h.content("2"), "<p>last words</p>");
    assert_eq!(h.store.writes(), 1);
    assert!(!h.scheduler.has_pending());
    assert!(!h.scheduler.is_saving());

    advance_ms(5000).await;
    h.settle().await;
    assert_eq!(h.store.writes(), 1, "flush cancels both timers");
}

#[tokio::test(start_paused = true)]
async fn test_flush_reports_store_failure() {
    let h = Harness::new();
    h.store.set_failing(true);
    h.scheduler.buffer_changed("1", "<p>x</p>");

    assert!(h.scheduler.flush().await.is_err());
    assert_eq!(h.notifier.errors(), vec!["Failed to save"]);
}
